use std::ffi::OsStr;
use std::fmt::Display;
use std::fs::File;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use justconfig::item::ValueExtractor;
use justconfig::sources::env::Env;
use justconfig::sources::text::ConfigText;
use justconfig::ConfPath;
use justconfig::Config;

use crate::config_processors::{parse_list, Unquote};
use crate::engine::PredictionEngine;
use crate::factorization::{FactorConfig, FactorModel};
use crate::neighborhood::similarity::SimilarityKind;
use crate::neighborhood::{NeighborhoodModel, DEFAULT_NEIGHBORHOOD_SIZE};

// Set some default values
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_NUM_FOLDS: usize = 5;
const DEFAULT_POSITIONS: &str = "1,5,10";

pub struct AppConfig {
    pub log: LogConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
    pub eval: EvalConfig,
}

pub struct LogConfig {
    pub level: String,
}

pub struct DataConfig {
    /// One path is split into `num_folds` folds, several paths are used as
    /// pre-split folds.
    pub ratings_paths: Vec<String>,
    pub num_folds: usize,
    pub fold_output_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Neighborhood,
    Factor,
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "neighborhood" => Ok(ModelKind::Neighborhood),
            "factor" => Ok(ModelKind::Factor),
            other => bail!("unknown model kind `{}`, expected neighborhood or factor", other),
        }
    }
}

pub struct ModelConfig {
    pub kind: ModelKind,
    pub neighborhood_size: usize,
    pub similarity: SimilarityKind,
    pub factor: FactorConfig,
}

pub struct EvalConfig {
    pub positions: Vec<usize>,
    pub num_users: Option<usize>,
    pub seed: Option<u64>,
}

impl AppConfig {
    pub fn new(config_path: &str) -> anyhow::Result<AppConfig> {
        // Initialize config object
        let mut conf = Config::default();

        // The config file is optional, environment variables may provide everything
        if let Ok(config_file) = File::open(config_path) {
            let config_text = ConfigText::new(config_file, config_path)
                .map_err(|e| anyhow!("{}", e))
                .with_context(|| format!("loading configuration file {}", config_path))?;
            conf.add_source(config_text);
        }

        let config_env = Env::new(&[
            (
                ConfPath::from(&["data", "ratings_paths"]),
                OsStr::new("RATINGS_DATA"),
            ),
            (ConfPath::from(&["log", "level"]), OsStr::new("LOG_LEVEL")),
        ]);
        conf.add_source(config_env);

        AppConfig::parse(&conf)
    }

    pub fn parse(conf: &Config) -> anyhow::Result<AppConfig> {
        Ok(AppConfig {
            log: LogConfig::parse(conf)?,
            data: DataConfig::parse(conf)?,
            model: ModelConfig::parse(conf)?,
            eval: EvalConfig::parse(conf)?,
        })
    }
}

fn raw_value(conf: &Config, section: &str, key: &str) -> anyhow::Result<Option<String>> {
    conf.get(ConfPath::from(&[section, key]))
        .unquote()
        .try_value()
        .map_err(|e| anyhow!("reading {}.{}: {}", section, key, e))
}

fn parsed_value<T>(conf: &Config, section: &str, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match raw_value(conf, section, key)? {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid value `{}` for {}.{}: {}", raw, section, key, e)),
        None => Ok(None),
    }
}

impl LogConfig {
    fn parse(conf: &Config) -> anyhow::Result<LogConfig> {
        Ok(LogConfig {
            level: raw_value(conf, "log", "level")?
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

impl DataConfig {
    fn parse(conf: &Config) -> anyhow::Result<DataConfig> {
        let raw_paths = raw_value(conf, "data", "ratings_paths")?
            .context("data.ratings_paths (or RATINGS_DATA) must be set")?;
        let ratings_paths: Vec<String> =
            parse_list(&raw_paths).map_err(|e| anyhow!("data.ratings_paths: {:?}", e))?;
        if ratings_paths.is_empty() {
            bail!("data.ratings_paths does not name any file");
        }

        let num_folds = parsed_value(conf, "data", "num_folds")?.unwrap_or(DEFAULT_NUM_FOLDS);
        if num_folds < 2 {
            bail!("data.num_folds must be at least 2, got {}", num_folds);
        }

        Ok(DataConfig {
            ratings_paths,
            num_folds,
            fold_output_dir: raw_value(conf, "data", "fold_output_dir")?,
        })
    }
}

impl ModelConfig {
    fn parse(conf: &Config) -> anyhow::Result<ModelConfig> {
        let defaults = FactorConfig::default();
        let factor = FactorConfig {
            rank: parsed_value(conf, "model", "rank")?.unwrap_or(defaults.rank),
            regularization: parsed_value(conf, "model", "regularization")?
                .unwrap_or(defaults.regularization),
            max_epochs: parsed_value(conf, "model", "max_epochs")?.unwrap_or(defaults.max_epochs),
            seed: parsed_value(conf, "model", "seed")?,
            ..defaults
        };
        if factor.rank == 0 {
            bail!("model.rank must be positive");
        }

        Ok(ModelConfig {
            kind: parsed_value(conf, "model", "kind")?.unwrap_or(ModelKind::Neighborhood),
            neighborhood_size: parsed_value(conf, "model", "neighborhood_size")?
                .unwrap_or(DEFAULT_NEIGHBORHOOD_SIZE),
            similarity: parsed_value(conf, "model", "similarity")?
                .unwrap_or(SimilarityKind::AdjustedCosine),
            factor,
        })
    }

    pub fn build_engine(&self) -> Box<dyn PredictionEngine> {
        match self.kind {
            ModelKind::Neighborhood => Box::new(NeighborhoodModel::new(
                self.neighborhood_size,
                self.similarity,
            )),
            ModelKind::Factor => Box::new(FactorModel::new(self.factor.clone())),
        }
    }
}

impl EvalConfig {
    fn parse(conf: &Config) -> anyhow::Result<EvalConfig> {
        let raw_positions = raw_value(conf, "eval", "positions")?
            .unwrap_or_else(|| DEFAULT_POSITIONS.to_string());
        let positions: Vec<usize> = parse_list(&raw_positions)
            .map_err(|e| anyhow!("invalid eval.positions `{}`: {}", raw_positions, e))?;
        if positions.is_empty() || positions.contains(&0) {
            bail!("eval.positions must list positive cutoffs, got `{}`", raw_positions);
        }

        Ok(EvalConfig {
            positions,
            num_users: parsed_value(conf, "eval", "num_users")?,
            seed: parsed_value(conf, "eval", "seed")?,
        })
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    fn config_from(text: &str) -> anyhow::Result<AppConfig> {
        let mut conf = Config::default();
        conf.add_source(ConfigText::new(text.as_bytes(), "test.conf").unwrap());
        AppConfig::parse(&conf)
    }

    #[test]
    fn should_apply_defaults() {
        let config = config_from("data.ratings_paths=\"ratings.csv\"\n").unwrap();

        assert_eq!("info", config.log.level);
        assert_eq!(vec!["ratings.csv"], config.data.ratings_paths);
        assert_eq!(5, config.data.num_folds);
        assert_eq!(None, config.data.fold_output_dir);
        assert_eq!(ModelKind::Neighborhood, config.model.kind);
        assert_eq!(50, config.model.neighborhood_size);
        assert_eq!(SimilarityKind::AdjustedCosine, config.model.similarity);
        assert_eq!(FactorConfig::default(), config.model.factor);
        assert_eq!(vec![1, 5, 10], config.eval.positions);
        assert_eq!(None, config.eval.num_users);
    }

    #[test]
    fn should_read_all_sections() {
        let config = config_from(
            "log.level=debug\n\
             data.ratings_paths=a.csv,b.csv\n\
             data.num_folds=3\n\
             model.kind=factor\n\
             model.rank=8\n\
             model.max_epochs=20\n\
             model.seed=42\n\
             model.similarity=cosine\n\
             eval.positions=1,3\n\
             eval.num_users=10\n",
        )
        .unwrap();

        assert_eq!("debug", config.log.level);
        assert_eq!(vec!["a.csv", "b.csv"], config.data.ratings_paths);
        assert_eq!(3, config.data.num_folds);
        assert_eq!(ModelKind::Factor, config.model.kind);
        assert_eq!(8, config.model.factor.rank);
        assert_eq!(20, config.model.factor.max_epochs);
        assert_eq!(Some(42), config.model.factor.seed);
        assert_eq!(SimilarityKind::Cosine, config.model.similarity);
        assert_eq!(vec![1, 3], config.eval.positions);
        assert_eq!(Some(10), config.eval.num_users);
        assert_eq!("factor", config.model.build_engine().name());
    }

    #[test]
    fn should_reject_invalid_values() {
        assert!(config_from("log.level=info\n").is_err());
        assert!(config_from("data.ratings_paths=a.csv\ndata.num_folds=1\n").is_err());
        assert!(config_from("data.ratings_paths=a.csv\neval.positions=0,5\n").is_err());
        assert!(config_from("data.ratings_paths=a.csv\nmodel.kind=svd\n").is_err());
    }
}
