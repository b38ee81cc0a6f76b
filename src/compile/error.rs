//! Structural error types raised once per graph, before any student runs.

use thiserror::Error;

use crate::model::TaskId;

/// One structural problem found in an authored graph.
///
/// Validation collects every defect it can find instead of stopping at the
/// first, so the editor can show the teacher the whole repair list at once.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphDefect {
    #[error("duplicate node id '{id}'")]
    DuplicateNodeId { id: String },

    #[error("edge endpoint references unknown node id '{id}'")]
    UnknownEdgeEndpoint { id: String },

    #[error("cycle detected through node '{id}'")]
    Cycle { id: String },

    #[error("model has no sink node")]
    NoSink,

    #[error("model has {count} sink nodes, expected exactly one")]
    MultipleSinks { count: usize },

    #[error("source '{id}' is bound to unknown task {}", .task.0)]
    UnknownTask { id: String, task: TaskId },

    #[error("task {} is bound by both '{first}' and '{second}'", .task.0)]
    DuplicateSourceTask {
        task: TaskId,
        first: String,
        second: String,
    },

    #[error("node '{id}' ({kind}) has {actual} inputs, expected {expected}")]
    InputArity {
        id: String,
        kind: &'static str,
        expected: String,
        actual: usize,
    },

    #[error("sink '{id}' has outgoing edges")]
    SinkWithOutputs { id: String },

    #[error("average '{id}' requires a positive weight on the edge from '{from}'")]
    InvalidAverageWeight { id: String, from: String },

    #[error("require '{id}' has a non-finite threshold")]
    InvalidThreshold { id: String },

    #[error("stepper '{id}' has invalid parameters: {reason}")]
    InvalidStepper { id: String, reason: String },

    #[error("node '{id}' cannot reach the sink")]
    Orphan { id: String },
}

/// Fatal validation outcome: the whole batch is rejected, no student was
/// evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("grading model failed validation with {} defect(s)", .defects.len())]
pub struct MalformedGraph {
    pub defects: Vec<GraphDefect>,
}

impl MalformedGraph {
    pub fn new(defects: Vec<GraphDefect>) -> Self {
        Self { defects }
    }
}
