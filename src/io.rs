use serde_derive::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub type UserIdx = usize;
pub type ItemIdx = usize;
pub type Rating = f64;

/// One observed rating as it appears in a ratings file:
/// `<user_id>,<item_id>,<rating>,<timestamp>[,<fold>]`.
///
/// The timestamp is kept verbatim so folds can be written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub user_id: String,
    pub item_id: String,
    pub rating: Rating,
    pub timestamp: String,
    pub fold: Option<usize>,
}

impl RatingRecord {
    pub fn new(user_id: &str, item_id: &str, rating: Rating, timestamp: &str) -> Self {
        RatingRecord {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            rating,
            timestamp: timestamp.to_string(),
            fold: None,
        }
    }
}

#[derive(Serialize)]
struct RatingRow<'a> {
    user_id: &'a str,
    item_id: &'a str,
    rating: Rating,
    timestamp: &'a str,
}

pub fn read_ratings<P: AsRef<Path>>(ratings_path: P) -> Result<Vec<RatingRecord>> {
    let file = File::open(ratings_path)?;
    read_ratings_from(BufReader::new(file))
}

pub fn read_ratings_from<R: io::Read>(source: R) -> Result<Vec<RatingRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let raw = result?;
        let line = raw
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(index + 1);
        records.push(parse_record(&raw, line)?);
    }
    Ok(records)
}

fn parse_record(raw: &csv::StringRecord, line: usize) -> Result<RatingRecord> {
    let malformed = |reason: String| Error::MalformedRecord { line, reason };

    if raw.len() != 4 && raw.len() != 5 {
        return Err(malformed(format!("expected 4 or 5 fields, found {}", raw.len())));
    }

    let user_id = &raw[0];
    let item_id = &raw[1];
    if user_id.is_empty() || item_id.is_empty() {
        return Err(malformed("empty user or item identifier".to_string()));
    }

    let rating = raw[2]
        .parse::<Rating>()
        .map_err(|_| malformed(format!("rating `{}` is not a number", &raw[2])))?;
    if !rating.is_finite() || rating < 0.0 {
        return Err(malformed(format!("rating {} is outside [0, inf)", rating)));
    }

    let fold = match raw.get(4) {
        Some(label) if !label.is_empty() => Some(
            label
                .parse::<usize>()
                .map_err(|_| malformed(format!("fold label `{}` is not an index", label)))?,
        ),
        _ => None,
    };

    Ok(RatingRecord {
        user_id: user_id.to_string(),
        item_id: item_id.to_string(),
        rating,
        timestamp: raw[3].to_string(),
        fold,
    })
}

pub fn write_ratings<'a, P, I>(ratings_path: P, records: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a RatingRecord>,
{
    let file = File::create(ratings_path)?;
    write_ratings_to(file, records)
}

pub fn write_ratings_to<'a, W, I>(sink: W, records: I) -> Result<()>
where
    W: io::Write,
    I: IntoIterator<Item = &'a RatingRecord>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(sink);
    for record in records {
        writer.serialize(RatingRow {
            user_id: &record.user_id,
            item_id: &record.item_id,
            rating: record.rating,
            timestamp: &record.timestamp,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes each fold to `<output_dir>/ratings_split_<n>.csv`, numbering folds from 1.
pub fn write_folds<'a, P, F>(output_dir: P, folds: F) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: IntoIterator<Item = Vec<&'a RatingRecord>>,
{
    fs::create_dir_all(&output_dir)?;
    let mut written = Vec::new();
    for (fold, records) in folds.into_iter().enumerate() {
        let fold_path = output_dir
            .as_ref()
            .join(format!("ratings_split_{}.csv", fold + 1));
        write_ratings(&fold_path, records)?;
        written.push(fold_path);
    }
    Ok(written)
}
