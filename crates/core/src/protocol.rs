use crate::error::FontError;
use crate::family::{Family, FamilyName};
use crate::policy::{Format, Weight};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Identity of one cached asset.
///
/// Equality and hashing use the normalized family name only; the upstream
/// spelling rides along for resolution.
#[derive(Debug, Clone)]
pub struct CacheKey {
    pub family: Family,
    pub weight: Weight,
    pub format: Format,
}

impl CacheKey {
    pub fn new(family: Family, weight: Weight, format: Format) -> Self {
        Self {
            family,
            weight,
            format,
        }
    }

    pub fn name(&self) -> &FamilyName {
        &self.family.name
    }

    /// `Open-Sans-700.woff2`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.{}",
            self.family.name.slug(),
            self.weight,
            self.format.extension()
        )
    }

    /// Path below the cache root: one directory per family, one file per
    /// (weight, format).
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.family.name.slug()).join(self.file_name())
    }

    /// `Open-Sans/Open-Sans-700.woff2`
    pub fn entry_name(&self) -> String {
        format!("{}/{}", self.family.name.slug(), self.file_name())
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.family.name == other.family.name
            && self.weight == other.weight
            && self.format == other.format
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family.name.hash(state);
        self.weight.hash(state);
        self.format.hash(state);
    }
}

/// What happened to one (family, weight) item of an archive job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Stored { entry_name: String, bytes: u64 },
    Failed { kind: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub family: FamilyName,
    pub weight: Weight,
    pub format: Format,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn stored(key: &CacheKey, bytes: u64) -> Self {
        Self {
            family: key.family.name.clone(),
            weight: key.weight,
            format: key.format,
            status: ItemStatus::Stored {
                entry_name: key.entry_name(),
                bytes,
            },
        }
    }

    pub fn failed(key: &CacheKey, error: &FontError) -> Self {
        Self {
            family: key.family.name.clone(),
            weight: key.weight,
            format: key.format,
            status: ItemStatus::Failed {
                kind: error.kind().to_string(),
                reason: error.to_string(),
            },
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self.status, ItemStatus::Stored { .. })
    }
}

/// Per item tally of a finished archive job, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl JobReport {
    pub fn record(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn stored(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_stored()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.stored()
    }

    pub fn entry_names(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                ItemStatus::Stored { entry_name, .. } => Some(entry_name.as_str()),
                ItemStatus::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_stored())
    }
}
