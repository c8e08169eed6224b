//! The two-phase filter contract.
//!
//! A filter is validated (`preflight`) and run (`execute`) as two distinct
//! phases. Preflight receives a shared reference to the store, so it cannot
//! mutate it by construction; it returns the structural
//! [`OutputActions`](crate::actions::OutputActions) its execute phase relies
//! on, plus UI-facing derived values. The engine applies those actions and
//! only then calls `execute`, which does the algorithmic work directly on
//! the now-correctly-shaped store under a cooperative cancellation token
//! and a one-way message sink.
//!
//! Each pipeline node tracks the filter through the state machine
//! `Idle -> Preflighting -> (PreflightFailed | PreflightOk) -> Executing ->
//! (ExecuteFailed | ExecuteOk)`, re-entering `Idle` whenever upstream
//! arguments or a preceding filter's output change.

pub mod arguments;
pub mod cancel;
pub mod chunks;
pub mod message;

use serde::{Deserialize, Serialize};

pub use arguments::{ArgumentValue, Arguments};
pub use cancel::CancelToken;
pub use message::{ChannelSink, CollectingSink, LogSink, Message, MessageSink, NullSink};

use crate::actions::OutputActions;
use crate::result::MillResult;
use crate::store::structure::DataStructure;

/// A UI-facing derived value computed during preflight (e.g. the tuple
/// count an output will have). The pipeline ignores these; interactive
/// front-ends display them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightValue {
    /// Display name.
    pub name: String,
    /// Rendered value.
    pub value: String,
}

/// Everything preflight produces: staged actions plus derived values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreflightOutput {
    /// Structural mutations to apply before execute.
    pub actions: OutputActions,
    /// Derived values for interactive front-ends.
    pub preflight_values: Vec<PreflightValue>,
}

impl PreflightOutput {
    /// An empty output (no actions, no values).
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a finished action set with no derived values.
    pub fn from_actions(actions: OutputActions) -> Self {
        Self {
            actions,
            preflight_values: Vec::new(),
        }
    }
}

/// Cancellation and messaging handles passed to `execute`.
pub struct ExecuteContext<'a> {
    /// Shared cancellation flag; poll at loop boundaries.
    pub cancel: CancelToken,
    /// One-way progress/info sink; never blocks.
    pub messenger: &'a dyn MessageSink,
}

impl<'a> ExecuteContext<'a> {
    /// Build a context from its parts.
    pub fn new(cancel: CancelToken, messenger: &'a dyn MessageSink) -> Self {
        Self { cancel, messenger }
    }

    /// Report progress over a known work-unit count.
    pub fn progress(&self, filter: &str, current: usize, total: usize) {
        self.messenger.send(Message::Progress {
            filter: filter.to_owned(),
            current,
            total,
        });
    }

    /// Report free-form status text.
    pub fn info(&self, filter: &str, text: impl Into<String>) {
        self.messenger.send(Message::Info {
            filter: filter.to_owned(),
            text: text.into(),
        });
    }
}

/// The two-phase (`preflight`, `execute`) protocol every filter implements.
///
/// Implementations must be `Send + Sync`: the same filter value may be
/// preflighted repeatedly and concurrently by interactive tools.
pub trait Filter: Send + Sync + std::fmt::Debug {
    /// Stable registry key.
    fn name(&self) -> &'static str;

    /// Display name; defaults to the registry key.
    fn human_name(&self) -> &str {
        self.name()
    }

    /// Validate arguments against the store and stage structural actions.
    ///
    /// Must not mutate the store (enforced by the shared reference), must
    /// be idempotent, and is called repeatedly: after every argument edit
    /// in interactive tools, and by the pipeline immediately before this
    /// filter's own apply/execute step.
    fn preflight(&self, store: &DataStructure, args: &Arguments) -> MillResult<PreflightOutput>;

    /// Perform the algorithmic work.
    ///
    /// Runs only after the engine applied this filter's own actions, so
    /// every path preflight staged is present and correctly shaped. Long
    /// loops must poll `ctx.cancel` at chunk boundaries and return the
    /// distinguished `Cancelled` error promptly rather than leaving the
    /// store half-mutated when avoidable.
    fn execute(
        &self,
        store: &mut DataStructure,
        args: &Arguments,
        ctx: &ExecuteContext<'_>,
    ) -> MillResult<()>;
}

/// Observable lifecycle of a filter inside a pipeline node.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum FilterState {
    /// Not yet validated, or invalidated by an upstream change.
    #[default]
    Idle,
    /// Preflight in progress.
    Preflighting,
    /// Preflight returned errors.
    PreflightFailed,
    /// Preflight succeeded; actions are ready to apply.
    PreflightOk,
    /// Execute in progress.
    Executing,
    /// Execute returned errors or was cancelled.
    ExecuteFailed,
    /// Execute completed.
    ExecuteOk,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ok;

    #[derive(Debug)]
    struct Inert;

    impl Filter for Inert {
        fn name(&self) -> &'static str {
            "Inert"
        }

        fn preflight(
            &self,
            _store: &DataStructure,
            _args: &Arguments,
        ) -> MillResult<PreflightOutput> {
            ok(PreflightOutput::new())
        }

        fn execute(
            &self,
            _store: &mut DataStructure,
            _args: &Arguments,
            _ctx: &ExecuteContext<'_>,
        ) -> MillResult<()> {
            ok(())
        }
    }

    #[test]
    fn filters_are_object_safe() {
        let filter: Box<dyn Filter> = Box::new(Inert);
        assert_eq!(filter.name(), "Inert");
        assert_eq!(filter.human_name(), "Inert");
    }

    #[test]
    fn context_forwards_messages() {
        let sink = CollectingSink::new();
        let ctx = ExecuteContext::new(CancelToken::new(), &sink);
        ctx.progress("F", 5, 10);
        ctx.info("F", "halfway");
        let messages = sink.take();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            Message::Progress {
                filter: "F".into(),
                current: 5,
                total: 10
            }
        );
    }
}
