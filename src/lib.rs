//! # data-mill
//!
//! data-mill is a staged filter-pipeline framework over a hierarchical, typed
//! in-memory data store, designed for scientific data processing workflows.
//! Independent filter units read and mutate a shared [`DataStructure`]
//! (a path-addressed graph of groups, attribute matrices, typed arrays and
//! geometries), then hand it to the next filter.
//!
//! ## Features
//! - Arena-owned object graph with shared ownership and weak geometry links
//! - Typed arrays over a closed set of eleven element types, with a visitor
//!   dispatch entry point so one generic operation covers every type
//! - Staged mutations: preflight emits serializable `Action` sets that the
//!   engine applies all-or-nothing before execute runs
//! - Structured result channel (coded errors and non-blocking warnings)
//! - Cooperative cancellation and synchronized progress messaging
//! - Sequential pipeline engine with per-node re-validation
//!
//! ## Two-phase contract
//!
//! `preflight` receives a shared reference to the store and can only stage
//! actions; `execute` runs after the engine applied them and works on the
//! correctly-shaped store directly. Preflight is re-run immediately before
//! each node's own apply/execute step, so downstream validation always sees
//! upstream output.
//!
//! ## Parallel execute bodies
//!
//! Within a single filter's execute, per-tuple loops may parallelize over
//! disjoint chunks (enable the `rayon-support` feature for the parallel
//! helpers); the cancel token is a single shared flag polled per chunk, and
//! messages funnel through synchronized sinks.
//!
//! [`DataStructure`]: crate::store::structure::DataStructure

// Re-export our major subsystems:
pub mod actions;
pub mod debug_invariants;
pub mod filter;
pub mod filters;
pub mod geometry;
pub mod mill_error;
pub mod pipeline;
pub mod result;
pub mod store;

pub use debug_invariants::DebugInvariants;
pub use mill_error::DataMillError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::actions::{Action, DataAssociation, OutputActions};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::filter::{
        ArgumentValue, Arguments, CancelToken, ChannelSink, CollectingSink, ExecuteContext,
        Filter, FilterState, LogSink, Message, MessageSink, NullSink, PreflightOutput,
        PreflightValue,
    };
    pub use crate::geometry::{GeometryConfig, GeometryKind, GeometryObject, GeometryShape};
    pub use crate::mill_error::DataMillError;
    pub use crate::pipeline::{
        FailurePhase, FilterRegistry, Pipeline, PipelineDocument, PipelineOutcome,
        PipelineReport,
    };
    pub use crate::result::{ErrorMessage, MillResult, Output, WarningMessage};
    pub use crate::store::array::DataArray;
    pub use crate::store::object::{DataObject, ObjectId, ObjectPayload};
    pub use crate::store::path::DataPath;
    pub use crate::store::structure::DataStructure;
    pub use crate::store::tagged::{
        ArrayElement, ArrayOp, ArrayOpMut, DataType, TaggedArray, TypeOp,
    };
}
