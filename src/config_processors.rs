use std::str::FromStr;

use justconfig::error::ConfigError;
use justconfig::item::{MapAction, StringItem};

/// Remove quotes from configuration strings.
pub trait Unquote
where
    Self: Sized,
{
    fn unquote(self) -> Result<StringItem, ConfigError>;
}

impl Unquote for Result<StringItem, ConfigError> {
    /// Trims every value and strips one pair of surrounding double quotes.
    /// Unquoted values are kept as they are, so `path = "a.csv"` and
    /// `path = a.csv` are equivalent.
    fn unquote(self) -> Result<StringItem, ConfigError> {
        self?.map(|v| {
            let v = v.trim();

            if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
                MapAction::Replace(vec![v[1..v.len() - 1].to_owned()])
            } else {
                MapAction::Keep
            }
        })
    }
}

/// Parses a comma separated list, ignoring blank entries.
pub fn parse_list<T>(raw: &str) -> Result<Vec<T>, T::Err>
where
    T: FromStr,
{
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}
