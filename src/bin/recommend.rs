use anyhow::{anyhow, Context};

use cfeval::config::AppConfig;
use cfeval::dataset::{Identities, LoadMode, RatingStore};
use cfeval::io;
use cfeval::logging::init_logging;
use cfeval::stats::RatingStats;

const USAGE: &str = "usage: recommend <config> <user_id> [how_many] [item_id]";
const DEFAULT_HOW_MANY: usize = 10;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let user_id = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let how_many = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid how_many `{}`", raw))?,
        None => DEFAULT_HOW_MANY,
    };
    let item_id = args.next();

    let config = AppConfig::new(&config_path)?;
    init_logging(&config.log.level);

    let mut records = Vec::new();
    for path in &config.data.ratings_paths {
        records.extend(
            io::read_ratings(path).with_context(|| format!("reading ratings from {}", path))?,
        );
    }
    RatingStats::compute("ratings", &records).log();

    let mut identities = Identities::new();
    let store = RatingStore::load(&records, &mut identities, LoadMode::Fresh)?;
    let user = identities.users.index_of(&user_id)?;

    let mut engine = config.model.build_engine();
    engine.train(store)?;

    println!("item,score");
    for scored in engine.predict_top_k(user, how_many)? {
        println!("{},{:.4}", identities.items.id_of(scored.id)?, scored.score);
    }

    if let Some(item_id) = item_id {
        let item = identities.items.index_of(&item_id)?;
        let rating = engine.predict_rating(user, item)?;
        println!("Predicted rating of {} for {}: {:.4}", user_id, item_id, rating);
    }
    Ok(())
}
