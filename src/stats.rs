use chrono::NaiveDateTime;
use hashbrown::HashSet;
use num_format::{Locale, ToFormattedString};
use rayon::prelude::*;
use tracing::info;

use crate::io::{Rating, RatingRecord};

pub struct RatingStats {
    pub descriptive_name: String,
    pub qty_records: usize,
    pub qty_unique_user_ids: usize,
    pub qty_unique_item_ids: usize,
    /// Share of the user x item matrix covered by the records.
    pub density: f64,
    pub min_rating: Rating,
    pub max_rating: Rating,
    pub mean_rating: Rating,
    /// Only known when every timestamp is in unix seconds.
    pub time_span: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl RatingStats {
    pub fn compute(descriptive_name: &str, records: &[RatingRecord]) -> RatingStats {
        let qty_records = records.len();

        let user_ids: HashSet<&str> = records
            .par_iter()
            .map(|record| record.user_id.as_str())
            .collect();
        let item_ids: HashSet<&str> = records
            .par_iter()
            .map(|record| record.item_id.as_str())
            .collect();
        let qty_unique_user_ids = user_ids.len();
        let qty_unique_item_ids = item_ids.len();

        let cells = qty_unique_user_ids * qty_unique_item_ids;
        let density = if cells > 0 {
            qty_records as f64 / cells as f64
        } else {
            0.0
        };

        let (min_rating, max_rating, mean_rating) = if records.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let ratings = records.par_iter().map(|record| record.rating);
            let min_rating = ratings.clone().reduce(|| f64::INFINITY, f64::min);
            let max_rating = ratings.clone().reduce(|| f64::NEG_INFINITY, f64::max);
            let mean_rating = ratings.sum::<f64>() / qty_records as f64;
            (min_rating, max_rating, mean_rating)
        };

        let time_span = records
            .par_iter()
            .map(|record| record.timestamp.parse::<i64>().ok())
            .collect::<Option<Vec<i64>>>()
            .and_then(|seconds| {
                let min_time = seconds.par_iter().min()?;
                let max_time = seconds.par_iter().max()?;
                Some((
                    NaiveDateTime::from_timestamp_opt(*min_time, 0)?,
                    NaiveDateTime::from_timestamp_opt(*max_time, 0)?,
                ))
            });

        RatingStats {
            descriptive_name: descriptive_name.to_string(),
            qty_records,
            qty_unique_user_ids,
            qty_unique_item_ids,
            density,
            min_rating,
            max_rating,
            mean_rating,
            time_span,
        }
    }

    pub fn log(&self) {
        info!("Loaded {}", self.descriptive_name);
        info!(
            "\tRatings: {}",
            self.qty_records.to_formatted_string(&Locale::en)
        );
        info!(
            "\tUsers: {}",
            self.qty_unique_user_ids.to_formatted_string(&Locale::en)
        );
        info!(
            "\tItems: {}",
            self.qty_unique_item_ids.to_formatted_string(&Locale::en)
        );
        info!("\tDensity: {:.6}", self.density);
        info!(
            "\tRatings min={} max={} mean={:.4}",
            self.min_rating, self.max_rating, self.mean_rating
        );
        if let Some((first, last)) = self.time_span {
            info!("\tSpan: {} / {}", first, last);
        }
    }
}

#[cfg(test)]
mod stats_test {
    use super::*;
    use crate::dataset::rating_store::rating_store_test::example_records;

    #[test]
    fn should_describe_example_corpus() {
        let stats = RatingStats::compute("example", &example_records());

        assert_eq!(15, stats.qty_records);
        assert_eq!(5, stats.qty_unique_user_ids);
        assert_eq!(6, stats.qty_unique_item_ids);
        assert_eq!(0.5, stats.density);
        assert_eq!(1.0, stats.min_rating);
        assert_eq!(5.0, stats.max_rating);
        assert!((stats.mean_rating - 50.0 / 15.0).abs() < 1e-9);

        let (first, last) = stats.time_span.unwrap();
        assert_eq!(978300000, first.timestamp());
        assert_eq!(978300014, last.timestamp());
    }

    #[test]
    fn should_skip_time_span_for_opaque_timestamps() {
        let records = vec![
            RatingRecord::new("U1", "I1", 4.0, "2001-01-01"),
            RatingRecord::new("U2", "I1", 2.0, "978300760"),
        ];
        let stats = RatingStats::compute("opaque", &records);
        assert_eq!(None, stats.time_span);
        assert_eq!(1.0, stats.density);
    }

    #[test]
    fn should_handle_empty_input() {
        let stats = RatingStats::compute("empty", &[]);
        assert_eq!(0, stats.qty_records);
        assert_eq!(0.0, stats.density);
        assert_eq!(None, stats.time_span);
    }
}
