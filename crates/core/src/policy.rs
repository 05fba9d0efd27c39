use crate::error::{FontError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Binary asset encodings the service relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Woff2,
    Ttf,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Woff2, Format::Ttf];

    /// Query token and file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Woff2 => "woff2",
            Format::Ttf => "ttf",
        }
    }

    /// User agent sent with manifest requests. The manifest service picks the
    /// asset encoding from it: browsers get woff2, plain clients get TrueType.
    pub fn client_signature(self) -> &'static str {
        match self {
            Format::Woff2 => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            }
            Format::Ttf => "Wget/1.21.4",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A font weight class: a multiple of 100 in `100..=900`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Weight(u16);

impl Weight {
    pub const ALL: [Weight; 9] = [
        Weight(100),
        Weight(200),
        Weight(300),
        Weight(400),
        Weight(500),
        Weight(600),
        Weight(700),
        Weight(800),
        Weight(900),
    ];

    pub fn new(value: u16) -> Option<Self> {
        if (100..=900).contains(&value) && value % 100 == 0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Weight {
    type Error = String;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        Weight::new(value).ok_or_else(|| format!("invalid weight {}", value))
    }
}

impl From<Weight> for u16 {
    fn from(weight: Weight) -> u16 {
        weight.0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const MIN_COUNT: usize = 10;
pub const MAX_COUNT: usize = 100;

/// Accepts exactly `woff2` or `ttf`.
pub fn validate_format(input: Option<&str>) -> Result<Format> {
    match input {
        Some("woff2") => Ok(Format::Woff2),
        Some("ttf") => Ok(Format::Ttf),
        Some(other) => Err(FontError::validation(format!(
            "Invalid format '{}'. Use woff2 or ttf",
            other
        ))),
        None => Err(FontError::validation("Missing format. Use woff2 or ttf")),
    }
}

/// Accepts an integer multiple of 10 in `10..=100`.
pub fn validate_count(input: Option<&str>) -> Result<usize> {
    let invalid = || {
        FontError::validation(format!(
            "Count must be a multiple of 10 between {} and {}",
            MIN_COUNT, MAX_COUNT
        ))
    };
    let count: usize = input
        .map(str::trim)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(invalid)?;
    if (MIN_COUNT..=MAX_COUNT).contains(&count) && count % 10 == 0 {
        Ok(count)
    } else {
        Err(invalid())
    }
}

/// Parses a comma separated weight list. Absent or blank input selects all
/// nine weights; tokens that are not valid weights are dropped.
pub fn parse_weights(input: Option<&str>) -> BTreeSet<Weight> {
    match input.map(str::trim) {
        None | Some("") => Weight::ALL.into_iter().collect(),
        Some(raw) => raw
            .split(',')
            .filter_map(|token| token.trim().parse::<u16>().ok())
            .filter_map(Weight::new)
            .collect(),
    }
}
