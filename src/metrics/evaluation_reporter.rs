use itertools::Itertools;

use crate::metrics::eva_matrix::EvaMatrix;

/// Renders an [`EvaMatrix`] as a comma separated header and value line.
pub struct EvaluationReporter<'a> {
    matrix: &'a EvaMatrix,
}

impl<'a> EvaluationReporter<'a> {
    pub fn new(matrix: &'a EvaMatrix) -> EvaluationReporter<'a> {
        EvaluationReporter { matrix }
    }

    fn at_positions(&self, prefix: &str) -> impl Iterator<Item = String> + '_ {
        let prefix = prefix.to_string();
        self.matrix
            .positions
            .iter()
            .map(move |position| format!("{}@{}", prefix, position))
    }

    pub fn result(&self) -> String {
        let matrix = self.matrix;
        let rmse_score = format!("{:.4}", matrix.rmse);
        let mae_score = format!("{:.4}", matrix.mae);
        let ranking_scores = matrix
            .p_at_k
            .iter()
            .chain(matrix.r_at_k.iter())
            .chain(matrix.mrr_at_k.iter())
            .chain(matrix.ndcg_at_k.iter())
            .map(|score| format!("{:.4}", score))
            .join(",");
        let time = format!("{:.4}", matrix.time);
        format!("{},{},{},{}", rmse_score, mae_score, ranking_scores, time)
    }

    pub fn get_name(&self) -> String {
        let ranking_names = self
            .at_positions("P")
            .chain(self.at_positions("R"))
            .chain(self.at_positions("MRR"))
            .chain(self.at_positions("NDCG"))
            .join(",");
        format!("RMSE,MAE,{},Time", ranking_names)
    }
}

#[cfg(test)]
mod evaluation_reporter_test {
    use super::*;

    #[test]
    fn should_render_header_and_values() {
        let mut matrix = EvaMatrix::new(&[1, 5]);
        matrix.rmse = 0.912345;
        matrix.mae = 0.75;
        matrix.p_at_k = vec![0.5, 0.2];
        matrix.r_at_k = vec![0.25, 1.0];
        matrix.mrr_at_k = vec![0.5, 0.5];
        matrix.ndcg_at_k = vec![0.5, 0.38692];
        matrix.time = 1.5;

        let reporter = EvaluationReporter::new(&matrix);
        assert_eq!(
            "RMSE,MAE,P@1,P@5,R@1,R@5,MRR@1,MRR@5,NDCG@1,NDCG@5,Time",
            reporter.get_name()
        );
        assert_eq!(
            "0.9123,0.7500,0.5000,0.2000,0.2500,1.0000,0.5000,0.5000,0.5000,0.3869,1.5000",
            reporter.result()
        );
    }
}
