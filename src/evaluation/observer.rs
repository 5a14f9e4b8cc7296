use indicatif::{ProgressBar, ProgressStyle};

use crate::metrics::EvaMatrix;

/// Progress notifications emitted while an evaluation runs. Every method
/// defaults to doing nothing.
pub trait EvaluationObserver {
    fn fold_started(&mut self, _fold: usize, _num_folds: usize) {}

    fn user_evaluated(&mut self, _done: usize, _total: usize) {}

    fn fold_finished(&mut self, _fold: usize, _result: &EvaMatrix) {}

    fn finished(&mut self, _result: &EvaMatrix) {}
}

pub struct NoProgress;

impl EvaluationObserver for NoProgress {}

/// Draws one progress bar per fold on the terminal.
#[derive(Default)]
pub struct ProgressBarObserver {
    bar: Option<ProgressBar>,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        ProgressBarObserver::default()
    }
}

impl EvaluationObserver for ProgressBarObserver {
    fn fold_started(&mut self, fold: usize, num_folds: usize) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40}] {pos}/{len} users ({eta})")
                .progress_chars("=> "),
        );
        pb.set_message(format!("fold {}/{}", fold + 1, num_folds));
        self.bar = Some(pb);
    }

    fn user_evaluated(&mut self, done: usize, total: usize) {
        if let Some(pb) = &self.bar {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        }
    }

    fn fold_finished(&mut self, _fold: usize, _result: &EvaMatrix) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
