//! Core types shared by the fontbundle crates: family names, the small
//! enumerated inputs and their validation, cache keys, job reports and the
//! error taxonomy.

pub mod config;
pub mod error;
pub mod family;
pub mod policy;
pub mod protocol;

pub use error::{FontError, Result};
pub use family::{Family, FamilyName};
pub use policy::{Format, Weight};
pub use protocol::{CacheKey, ItemOutcome, ItemStatus, JobReport};
