//! # Typecrab: The Supplier
//!
//! **Font family catalog, asset resolution and an on-disk asset cache.**
//!
//! Typecrab knows which families exist, where their binaries live and keeps a
//! local copy of every asset it has fetched.
//!
//! ## Core Features
//!
//! - **Family Catalog**: an immutable snapshot of the family directory (or a
//!   local `families = [..]` TOML file), with normalized lookups and random sampling.
//! - **Asset Resolution**: requests a style manifest for a family and weight
//!   and extracts the first asset reference for the wanted format.
//! - **Local Caching**: one file per (family, weight, format), published with an
//!   atomic rename so concurrent fills never corrupt an entry.
//!
//! ## Usage
//!
//! ```no_run
//! use fontbundle_core::config::DEFAULT_MANIFEST_URL;
//! use fontbundle_core::{CacheKey, FamilyName, Format, Weight};
//! use std::sync::Arc;
//! use typecrab::{AssetCache, AssetResolver, FamilyCatalog, SurfUpstream, Upstream};
//!
//! #[async_std::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upstream: Arc<dyn Upstream> = Arc::new(SurfUpstream::new());
//!     let catalog = FamilyCatalog::from_toml_str(r#"families = ["Open Sans"]"#)?;
//!     let family = catalog
//!         .lookup(&FamilyName::new("open sans"))
//!         .cloned()
//!         .ok_or("unknown family")?;
//!
//!     let resolver = AssetResolver::new(upstream.clone(), DEFAULT_MANIFEST_URL);
//!     let cache = AssetCache::new("/tmp/fontbundle", resolver, upstream);
//!     let weight = Weight::new(700).ok_or("bad weight")?;
//!     let asset = cache.get(&CacheKey::new(family, weight, Format::Woff2)).await?;
//!
//!     println!("Asset available at: {:?}", asset.path);
//!     Ok(())
//! }
//! ```

/// Disk cache of resolved assets.
pub mod assets;

/// The immutable family catalog.
pub mod catalog;

/// Style manifest parsing and asset resolution.
pub mod resolver;

pub mod stub;

/// Upstream HTTP access.
pub mod transport;

pub use assets::{AssetCache, CachedAsset};
pub use catalog::FamilyCatalog;
pub use resolver::{extract_asset_reference, AssetResolver};
pub use stub::StubUpstream;
pub use transport::{SurfUpstream, TransportError, Upstream};
