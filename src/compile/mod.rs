//! Once-per-graph work: structural validation, the compiled snapshot, and
//! graph-level risk flags. Everything here runs to completion before any
//! student is evaluated.

pub mod error;
pub mod program;
pub mod risk;
pub mod validator;

pub use error::{GraphDefect, MalformedGraph};
pub use program::{CompiledModel, SourceBinding};
pub use risk::{assess_risks, ModelRisks};
pub use validator::compile;
