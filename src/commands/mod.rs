pub mod analyze;
pub mod classify;
pub mod ground_truth;
