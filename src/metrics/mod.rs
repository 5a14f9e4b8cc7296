pub mod eva_matrix;
pub mod evaluation_reporter;
pub mod ranking;

pub use eva_matrix::EvaMatrix;
pub use evaluation_reporter::EvaluationReporter;
