//! Per-student evaluation: the value ledger, the per-kind kernel, the
//! topological walk and the parallel batch driver.

pub mod batch;
pub mod engine;
pub mod kernel;
pub mod ledger;

pub use batch::{evaluate, evaluate_student, BatchOutcome};
pub use engine::{walk, WalkOutcome};
pub use ledger::{EvalFault, Ledger, Value};
