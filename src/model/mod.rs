//! Defines the core data structures for grading models and grade records.
pub mod records;
pub mod types;

// Re-export key types for convenient access
pub use records::{
    EffectiveInput, ExpiredOption, GradeRecord, SelectionMode, SelectionPolicy, StudentInput,
};
pub use types::{
    CourseTask, Edge, FailAction, GradingScale, GraphStructure, Node, NodeIx, NodeKind, RoundMode,
    TaskCatalog, TaskId, TaskStatus, UserId,
};
