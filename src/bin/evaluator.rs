use anyhow::Context;
use num_format::{Locale, ToFormattedString};
use tracing::info;

use cfeval::config::AppConfig;
use cfeval::evaluation::{Evaluator, ProgressBarObserver};
use cfeval::io;
use cfeval::logging::init_logging;
use cfeval::metrics::EvaluationReporter;
use cfeval::stats::RatingStats;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_default();
    let config = AppConfig::new(&config_path)?;
    init_logging(&config.log.level);

    let ratings_paths = &config.data.ratings_paths;
    let evaluator = if ratings_paths.len() == 1 {
        let path = &ratings_paths[0];
        let records = io::read_ratings(path)
            .with_context(|| format!("reading ratings from {}", path))?;
        RatingStats::compute(path, &records).log();
        if Evaluator::is_labeled(&records) {
            Evaluator::load_labeled(records)?
        } else {
            Evaluator::load_total(config.data.num_folds, records, config.eval.seed)?
        }
    } else {
        let folds = ratings_paths
            .iter()
            .map(|path| {
                let records = io::read_ratings(path)
                    .with_context(|| format!("reading fold from {}", path))?;
                RatingStats::compute(path, &records).log();
                Ok(records)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Evaluator::load_split(folds)?
    };

    if let Some(output_dir) = &config.data.fold_output_dir {
        let written = io::write_folds(output_dir, evaluator.folds())
            .with_context(|| format!("writing folds to {}", output_dir))?;
        info!("Wrote {} fold files to {}", written.len(), output_dir);
    }

    let users = match config.eval.num_users {
        Some(how_many) => Some(evaluator.sample_users(how_many, config.eval.seed)?),
        None => None,
    };
    let qty_users = users
        .as_ref()
        .map(Vec::len)
        .unwrap_or_else(|| evaluator.identities().users.len());
    info!(
        "Evaluating {} users over {} folds",
        qty_users.to_formatted_string(&Locale::en),
        evaluator.num_folds()
    );

    let mut engine = config.model.build_engine();
    let mut progress = ProgressBarObserver::new();
    let result = evaluator.evaluate(
        engine.as_mut(),
        &config.eval.positions,
        users.as_deref(),
        &mut progress,
    )?;

    let reporter = EvaluationReporter::new(&result);
    println!("===============================================================");
    println!("===          {:^36}          ====", format!("{} model", engine.name()));
    println!("===============================================================");
    println!("{}", reporter.get_name());
    println!("{}", reporter.result());
    Ok(())
}
