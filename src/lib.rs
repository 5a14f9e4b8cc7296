pub mod candidates;
pub mod config;
pub mod config_processors;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod factorization;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod neighborhood;
pub mod stats;
pub mod stopwatch;
