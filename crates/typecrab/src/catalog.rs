use crate::transport::Upstream;
use anyhow::Context;
use fontbundle_core::{Family, FamilyName, FontError, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    items: Vec<DirectoryItem>,
}

#[derive(Debug, Deserialize)]
struct DirectoryItem {
    family: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    families: Vec<String>,
}

/// Snapshot of every known family, fixed for the life of the process.
///
/// Order follows the source (popularity for the directory service). Entries
/// are unique by normalized name; the first spelling seen wins.
#[derive(Debug, Clone, Default)]
pub struct FamilyCatalog {
    families: Vec<Family>,
    index: HashMap<FamilyName, usize>,
}

impl FamilyCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::default();
        for name in names {
            let family = Family::new(name.as_ref());
            if family.name.is_empty() || catalog.index.contains_key(&family.name) {
                continue;
            }
            if !family.name.is_path_safe() {
                log::warn!("Ignoring family {:?}: not usable as a cache path", family.upstream);
                continue;
            }
            catalog
                .index
                .insert(family.name.clone(), catalog.families.len());
            catalog.families.push(family);
        }
        catalog
    }

    /// Fetches the full family list from the directory service. Any failure,
    /// including an empty or malformed listing, is fatal to the caller.
    pub async fn load(
        upstream: &dyn Upstream,
        directory_url: &str,
        api_key: Option<&str>,
    ) -> Result<Self> {
        let mut url = format!("{}?sort=popularity", directory_url);
        let display_url = url.clone();
        if let Some(key) = api_key {
            url.push_str("&key=");
            url.push_str(key);
        }

        let body = upstream
            .fetch_text(&url, None)
            .await
            .map_err(|e| FontError::upstream(display_url.as_str(), e))?;
        let listing: DirectoryResponse = serde_json::from_str(&body).map_err(|e| {
            FontError::upstream(
                display_url.as_str(),
                format!("malformed directory listing: {}", e),
            )
        })?;

        let catalog = Self::new(listing.items.into_iter().map(|item| item.family));
        if catalog.is_empty() {
            return Err(FontError::upstream(display_url, "directory listing is empty"));
        }
        log::info!("Loaded {} font families from directory", catalog.len());
        Ok(catalog)
    }

    /// Parses `families = ["Roboto", ...]`.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let parsed: CatalogFile = toml::from_str(content).context("Invalid catalog file")?;
        let catalog = Self::new(parsed.families);
        anyhow::ensure!(!catalog.is_empty(), "Catalog file lists no families");
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read catalog file {:?}", path))?;
        let catalog = Self::from_toml_str(&content)?;
        log::info!("Loaded {} font families from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    pub fn contains(&self, name: &FamilyName) -> bool {
        self.index.contains_key(name)
    }

    pub fn lookup(&self, name: &FamilyName) -> Option<&Family> {
        self.index.get(name).map(|&i| &self.families[i])
    }

    /// `n` distinct families drawn uniformly without replacement. Asking for
    /// more than the catalog holds returns every family, shuffled.
    pub fn sample(&self, n: usize) -> Vec<Family> {
        if n > self.families.len() {
            log::warn!(
                "Requested {} families but the catalog holds {}",
                n,
                self.families.len()
            );
        }
        self.families
            .choose_multiple(&mut rand::thread_rng(), n)
            .cloned()
            .collect()
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubUpstream;
    use crate::transport::TransportError;
    use fontbundle_core::config::DEFAULT_DIRECTORY_URL;
    use std::collections::HashSet;

    fn numbered(n: usize) -> FamilyCatalog {
        FamilyCatalog::new((0..n).map(|i| format!("Family {}", i)))
    }

    #[test]
    fn test_dedupes_by_normalized_name() {
        let catalog = FamilyCatalog::new(["Roboto", "roboto", "Open Sans", "", "OPEN  SANS"]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.families()[0].upstream, "Roboto");
        assert_eq!(catalog.families()[1].upstream, "Open Sans");
    }

    #[test]
    fn test_skips_names_that_escape_the_cache_root() {
        let catalog = FamilyCatalog::new(["Lato", "..", "../../etc", "a/b", "c\\d", "Inter"]);
        let names: Vec<_> = catalog.families().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Lato", "Inter"]);
        assert!(!catalog.contains(&FamilyName::new("..")));
    }

    #[test]
    fn test_contains_uses_normalized_form() {
        let catalog = FamilyCatalog::new(["IBM Plex Sans"]);
        assert!(catalog.contains(&FamilyName::new("ibm plex sans")));
        assert!(!catalog.contains(&FamilyName::new("ibm plex")));
        assert_eq!(
            catalog
                .lookup(&FamilyName::new("Ibm Plex Sans"))
                .map(|f| f.upstream.as_str()),
            Some("IBM Plex Sans")
        );
    }

    #[test]
    fn test_sample_is_distinct_members() {
        let catalog = numbered(120);
        for n in [0, 1, 10, 50, 100, 120] {
            let picked = catalog.sample(n);
            assert_eq!(picked.len(), n);
            let unique: HashSet<_> = picked.iter().map(|f| f.name.clone()).collect();
            assert_eq!(unique.len(), n);
            assert!(picked.iter().all(|f| catalog.contains(&f.name)));
        }
    }

    #[test]
    fn test_sample_caps_at_catalog_size() {
        let catalog = numbered(5);
        let picked = catalog.sample(10);
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn test_from_toml() {
        let catalog = FamilyCatalog::from_toml_str(r#"families = ["Lato", "Inter"]"#).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(FamilyCatalog::from_toml_str("families = []").is_err());
        assert!(FamilyCatalog::from_toml_str("fonts = 3").is_err());
    }

    #[async_std::test]
    async fn test_load_from_directory() {
        let upstream = StubUpstream::new().with_directory(&["Roboto", "Open Sans", "Lato"]);
        let catalog = FamilyCatalog::load(&upstream, DEFAULT_DIRECTORY_URL, None)
            .await
            .unwrap();
        let names: Vec<_> = catalog.families().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Roboto", "Open Sans", "Lato"]);
    }

    #[async_std::test]
    async fn test_load_fails_without_directory() {
        let url = format!("{}?sort=popularity", DEFAULT_DIRECTORY_URL);
        let upstream =
            StubUpstream::new().with_failure(url, TransportError::Network("refused".into()));
        let err = FamilyCatalog::load(&upstream, DEFAULT_DIRECTORY_URL, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FontError::UpstreamFetch { .. }));
    }

    #[async_std::test]
    async fn test_load_rejects_malformed_listing() {
        let url = format!("{}?sort=popularity", DEFAULT_DIRECTORY_URL);
        let upstream = StubUpstream::new().with_text(url, "<html>quota exceeded</html>");
        let err = FamilyCatalog::load(&upstream, DEFAULT_DIRECTORY_URL, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed"), "{}", err);
    }
}
