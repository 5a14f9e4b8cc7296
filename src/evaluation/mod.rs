pub mod evaluator;
pub mod kfold;
pub mod observer;

pub use evaluator::Evaluator;
pub use observer::{EvaluationObserver, NoProgress, ProgressBarObserver};
