//! Pipeline engine: sequences filters under the two-phase contract.
//!
//! Filters run strictly in order. For every node the engine re-runs
//! `preflight` against the store as mutated by the preceding executes —
//! validation is never cached across an earlier filter's execute — then
//! applies the node's staged actions atomically and runs `execute`. Any
//! error aborts the whole run at that node, reporting its index, name and
//! full error list, with the store left exactly as the last successful
//! execute produced it. Warnings accumulate across nodes and never halt
//! the run.

pub mod registry;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use registry::FilterRegistry;

use crate::filter::{
    Arguments, CancelToken, ExecuteContext, Filter, FilterState, MessageSink,
};
use crate::mill_error::DataMillError;
use crate::result::{ErrorMessage, WarningMessage};
use crate::store::structure::DataStructure;

/// One slot of a pipeline: a filter, its arguments, and its observable
/// lifecycle state.
pub struct PipelineNode {
    filter: Arc<dyn Filter>,
    arguments: Arguments,
    state: FilterState,
}

impl PipelineNode {
    /// Build a node in the `Idle` state.
    pub fn new(filter: Arc<dyn Filter>, arguments: Arguments) -> Self {
        Self {
            filter,
            arguments,
            state: FilterState::Idle,
        }
    }

    /// The node's filter.
    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    /// The node's arguments.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Replace the arguments, re-entering `Idle` (the node must be
    /// re-validated).
    pub fn set_arguments(&mut self, arguments: Arguments) {
        self.arguments = arguments;
        self.state = FilterState::Idle;
    }

    /// Where the node is in the
    /// `Idle -> Preflighting -> ... -> ExecuteOk` lifecycle.
    pub fn state(&self) -> FilterState {
        self.state
    }
}

/// Which phase a pipeline abort happened in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FailurePhase {
    /// The node's preflight returned errors.
    Preflight,
    /// Applying the node's staged actions failed.
    Apply,
    /// The node's execute returned errors.
    Execute,
}

/// How a pipeline run ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PipelineOutcome {
    /// Every node executed.
    Completed,
    /// Cooperative cancellation was observed at the named node.
    Cancelled {
        /// Index of the node that observed cancellation.
        node: usize,
        /// Its human name.
        name: String,
    },
    /// A node failed; the store remains as its predecessor left it.
    Aborted {
        /// Index of the failing node.
        node: usize,
        /// Its human name.
        name: String,
        /// The phase that failed.
        phase: FailurePhase,
        /// The node's full error list.
        errors: Vec<ErrorMessage>,
    },
}

impl PipelineOutcome {
    /// True for `Completed`.
    pub fn is_complete(&self) -> bool {
        matches!(self, PipelineOutcome::Completed)
    }
}

/// The result of a pipeline run: outcome plus accumulated warnings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// How the run ended.
    pub outcome: PipelineOutcome,
    /// Warnings gathered across every node; never abort a run.
    pub warnings: Vec<WarningMessage>,
}

/// A named, ordered sequence of filter nodes.
pub struct Pipeline {
    name: String,
    nodes: Vec<PipelineNode>,
}

impl Pipeline {
    /// An empty pipeline.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// The pipeline's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a node.
    pub fn push(&mut self, filter: Arc<dyn Filter>, arguments: Arguments) {
        self.nodes.push(PipelineNode::new(filter, arguments));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, filter: Arc<dyn Filter>, arguments: Arguments) -> Self {
        self.push(filter, arguments);
        self
    }

    /// The nodes in execution order.
    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    /// Mutable node access (argument edits re-enter `Idle`).
    pub fn nodes_mut(&mut self) -> &mut [PipelineNode] {
        &mut self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the pipeline holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate the whole pipeline against a staging copy of `store`
    /// without executing anything.
    ///
    /// Each node's preflight runs against the copy as mutated by the
    /// *staged actions* of its predecessors, so downstream nodes see the
    /// shapes upstream nodes will create. The real store is untouched.
    pub fn preflight_all(&mut self, store: &DataStructure) -> PipelineReport {
        let mut staging = store.clone();
        let mut warnings = Vec::new();
        for index in 0..self.nodes.len() {
            let node = &mut self.nodes[index];
            node.state = FilterState::Preflighting;
            let result = node.filter.preflight(&staging, &node.arguments);
            let name = node.filter.human_name().to_owned();
            match result {
                Ok(output) => {
                    warnings.extend(output.warnings.clone());
                    node.state = FilterState::PreflightOk;
                    if let Err(errors) = output.value.actions.apply_to(&mut staging) {
                        node.state = FilterState::PreflightFailed;
                        return PipelineReport {
                            outcome: PipelineOutcome::Aborted {
                                node: index,
                                name,
                                phase: FailurePhase::Apply,
                                errors,
                            },
                            warnings,
                        };
                    }
                }
                Err(errors) => {
                    node.state = FilterState::PreflightFailed;
                    return PipelineReport {
                        outcome: PipelineOutcome::Aborted {
                            node: index,
                            name,
                            phase: FailurePhase::Preflight,
                            errors,
                        },
                        warnings,
                    };
                }
            }
        }
        PipelineReport {
            outcome: PipelineOutcome::Completed,
            warnings,
        }
    }

    /// Run the pipeline to completion, cancellation, or first failure.
    ///
    /// For each node in order: re-preflight against the current store,
    /// apply the staged actions atomically, then execute. A node that
    /// returns the distinguished cancellation error ends the run with
    /// `Cancelled`; any other failure ends it with `Aborted`. In both
    /// cases the store keeps every change made by fully-executed
    /// predecessors and none from the failing node's staging.
    pub fn execute(
        &mut self,
        store: &mut DataStructure,
        cancel: &CancelToken,
        messenger: &dyn MessageSink,
    ) -> PipelineReport {
        let mut warnings = Vec::new();
        log::info!("pipeline `{}`: {} node(s)", self.name, self.nodes.len());

        for index in 0..self.nodes.len() {
            let node = &mut self.nodes[index];
            let name = node.filter.human_name().to_owned();

            if cancel.is_cancelled() {
                log::info!("pipeline `{}` cancelled before node {index} `{name}`", self.name);
                return PipelineReport {
                    outcome: PipelineOutcome::Cancelled { node: index, name },
                    warnings,
                };
            }

            // Preflight, freshly, against the store as upstream executes
            // left it.
            node.state = FilterState::Preflighting;
            log::debug!("node {index} `{name}`: preflight");
            let preflight = match node.filter.preflight(store, &node.arguments) {
                Ok(output) => {
                    node.state = FilterState::PreflightOk;
                    warnings.extend(output.warnings);
                    output.value
                }
                Err(errors) => {
                    node.state = FilterState::PreflightFailed;
                    log::error!("node {index} `{name}`: preflight failed ({} error(s))", errors.len());
                    return PipelineReport {
                        outcome: PipelineOutcome::Aborted {
                            node: index,
                            name,
                            phase: FailurePhase::Preflight,
                            errors,
                        },
                        warnings,
                    };
                }
            };

            log::debug!(
                "node {index} `{name}`: applying {} action(s)",
                preflight.actions.len()
            );
            match preflight.actions.apply_to(store) {
                Ok(mut apply_warnings) => warnings.append(&mut apply_warnings),
                Err(errors) => {
                    node.state = FilterState::PreflightFailed;
                    log::error!("node {index} `{name}`: action application failed");
                    return PipelineReport {
                        outcome: PipelineOutcome::Aborted {
                            node: index,
                            name,
                            phase: FailurePhase::Apply,
                            errors,
                        },
                        warnings,
                    };
                }
            }

            node.state = FilterState::Executing;
            log::info!("node {index} `{name}`: executing");
            let ctx = ExecuteContext::new(cancel.clone(), messenger);
            match node.filter.execute(store, &node.arguments, &ctx) {
                Ok(output) => {
                    warnings.extend(output.warnings);
                    node.state = FilterState::ExecuteOk;
                }
                Err(errors) => {
                    node.state = FilterState::ExecuteFailed;
                    let cancelled = errors
                        .iter()
                        .any(|e| e.code == DataMillError::Cancelled.code());
                    if cancelled {
                        log::info!("node {index} `{name}`: cancelled");
                        return PipelineReport {
                            outcome: PipelineOutcome::Cancelled { node: index, name },
                            warnings,
                        };
                    }
                    log::error!("node {index} `{name}`: execute failed ({} error(s))", errors.len());
                    return PipelineReport {
                        outcome: PipelineOutcome::Aborted {
                            node: index,
                            name,
                            phase: FailurePhase::Execute,
                            errors,
                        },
                        warnings,
                    };
                }
            }
        }

        log::info!("pipeline `{}` completed", self.name);
        PipelineReport {
            outcome: PipelineOutcome::Completed,
            warnings,
        }
    }

    /// Serializable snapshot of this pipeline.
    pub fn to_document(&self) -> PipelineDocument {
        PipelineDocument {
            name: self.name.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeDocument {
                    filter: node.filter.name().to_owned(),
                    arguments: node.arguments.clone(),
                })
                .collect(),
        }
    }

    /// Re-instantiate a pipeline from a document through a registry.
    ///
    /// # Errors
    /// `UnknownFilter` for any node name the registry cannot resolve.
    pub fn from_document(
        document: &PipelineDocument,
        registry: &FilterRegistry,
    ) -> Result<Self, DataMillError> {
        let mut pipeline = Pipeline::new(document.name.clone());
        for node in &document.nodes {
            let filter = registry.get(&node.filter)?;
            pipeline.push(filter, node.arguments.clone());
        }
        Ok(pipeline)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field(
                "nodes",
                &self
                    .nodes
                    .iter()
                    .map(|n| (n.filter.name(), n.state))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// One node of a serialized pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Registry key of the filter.
    pub filter: String,
    /// The node's arguments.
    pub arguments: Arguments,
}

/// A serialized pipeline: name plus ordered node documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    /// Pipeline name.
    pub name: String,
    /// Nodes in execution order.
    pub nodes: Vec<NodeDocument>,
}
