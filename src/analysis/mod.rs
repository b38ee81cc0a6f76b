pub mod stats;

pub use stats::ModelStats;
