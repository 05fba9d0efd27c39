use crate::transport::Upstream;
use fontbundle_core::{Family, FontError, Format, Result, Weight};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

// Asset references the manifest service embeds, one pattern per format.
static WOFF2_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://fonts\.gstatic\.com/[^\s)'"]+\.woff2"#).expect("valid woff2 pattern")
});
static TTF_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://fonts\.gstatic\.com/[^\s)'"]+\.ttf"#).expect("valid ttf pattern")
});

/// First asset reference for `format` present in a style manifest.
///
/// The manifest is generated by an external service and carries no contract;
/// this only promises to return the first matching reference, or `None`.
pub fn extract_asset_reference(manifest: &str, format: Format) -> Option<String> {
    let pattern = match format {
        Format::Woff2 => &*WOFF2_REFERENCE,
        Format::Ttf => &*TTF_REFERENCE,
    };
    pattern.find(manifest).map(|m| m.as_str().to_string())
}

/// `https://fonts.googleapis.com/css2?family=Open+Sans%3Awght%40700`
///
/// The family goes through form encoding, so reserved characters in a
/// directory entry cannot leak into the query structure.
pub fn manifest_url(base: &str, family: &Family, weight: Weight) -> Result<String> {
    let mut url = surf::Url::parse(base).map_err(|e| FontError::upstream(base, e))?;
    url.query_pairs_mut()
        .append_pair("family", &format!("{}:wght@{}", family.upstream, weight));
    Ok(url.into())
}

/// Derives asset locations from the upstream style manifest service.
#[derive(Clone)]
pub struct AssetResolver {
    upstream: Arc<dyn Upstream>,
    manifest_base: String,
}

impl AssetResolver {
    pub fn new(upstream: Arc<dyn Upstream>, manifest_base: impl Into<String>) -> Self {
        Self {
            upstream,
            manifest_base: manifest_base.into(),
        }
    }

    pub async fn resolve(&self, family: &Family, weight: Weight, format: Format) -> Result<String> {
        let url = manifest_url(&self.manifest_base, family, weight)?;
        let not_served = || FontError::Resolution {
            family: family.name.to_string(),
            weight: weight.value(),
            format: format.to_string(),
        };

        let manifest = match self
            .upstream
            .fetch_text(&url, Some(format.client_signature()))
            .await
        {
            Ok(manifest) => manifest,
            // The manifest service refuses weights a family does not ship.
            Err(e) if e.is_refusal() => {
                log::debug!("Manifest refused for {} {}: {}", family.name, weight, e);
                return Err(not_served());
            }
            Err(e) => return Err(FontError::upstream(url, e)),
        };

        extract_asset_reference(&manifest, format).ok_or_else(not_served)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubUpstream;
    use crate::transport::TransportError;
    use fontbundle_core::config::DEFAULT_MANIFEST_URL;

    const MANIFEST: &str = r#"/* latin-ext */
@font-face {
  font-family: 'Open Sans';
  font-style: normal;
  font-weight: 700;
  src: url(https://fonts.gstatic.com/s/opensans/v40/first.woff2) format('woff2');
  unicode-range: U+0100-02AF;
}
/* latin */
@font-face {
  font-family: 'Open Sans';
  src: url(https://fonts.gstatic.com/s/opensans/v40/second.woff2) format('woff2');
}
"#;

    fn weight(value: u16) -> Weight {
        Weight::new(value).unwrap()
    }

    #[test]
    fn test_extract_first_reference() {
        assert_eq!(
            extract_asset_reference(MANIFEST, Format::Woff2).as_deref(),
            Some("https://fonts.gstatic.com/s/opensans/v40/first.woff2")
        );
    }

    #[test]
    fn test_extract_none_for_other_format() {
        assert_eq!(extract_asset_reference(MANIFEST, Format::Ttf), None);
        assert_eq!(extract_asset_reference("", Format::Woff2), None);
    }

    #[test]
    fn test_extract_ignores_foreign_hosts() {
        let manifest = "src: url(https://cdn.example.com/a.ttf); \
                        src: url(https://fonts.gstatic.com/s/lato/v24/b.ttf);";
        assert_eq!(
            extract_asset_reference(manifest, Format::Ttf).as_deref(),
            Some("https://fonts.gstatic.com/s/lato/v24/b.ttf")
        );
    }

    #[test]
    fn test_manifest_url_uses_upstream_spelling() {
        let url = manifest_url(DEFAULT_MANIFEST_URL, &Family::new("IBM Plex Sans"), weight(300))
            .unwrap();
        assert_eq!(
            url,
            "https://fonts.googleapis.com/css2?family=IBM+Plex+Sans%3Awght%40300"
        );
    }

    #[test]
    fn test_manifest_url_encodes_reserved_characters() {
        let url = manifest_url(DEFAULT_MANIFEST_URL, &Family::new("A&B #1+"), weight(400)).unwrap();
        let parsed = surf::Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("family".to_string(), "A&B #1+:wght@400".to_string())]
        );
        assert_eq!(parsed.fragment(), None);
    }

    #[test]
    fn test_manifest_url_rejects_bad_base() {
        let err = manifest_url("not a url", &Family::new("Lato"), weight(400)).unwrap_err();
        assert_eq!(err.kind(), "upstream_fetch");
    }

    #[async_std::test]
    async fn test_resolve_from_stub() {
        let upstream = Arc::new(StubUpstream::new().with_family("Lato", &[400]));
        let resolver = AssetResolver::new(upstream.clone(), DEFAULT_MANIFEST_URL);

        let location = resolver
            .resolve(&Family::new("Lato"), weight(400), Format::Ttf)
            .await
            .unwrap();
        assert!(location.ends_with("Lato-400.ttf"), "{}", location);
        assert_eq!(upstream.requests(), 1);
    }

    #[async_std::test]
    async fn test_refused_manifest_is_resolution_error() {
        let upstream = Arc::new(StubUpstream::new().with_family("Lato", &[400]));
        let resolver = AssetResolver::new(upstream, DEFAULT_MANIFEST_URL);

        let err = resolver
            .resolve(&Family::new("Lato"), weight(100), Format::Woff2)
            .await
            .unwrap_err();
        assert!(matches!(err, FontError::Resolution { weight: 100, .. }), "{:?}", err);
    }

    #[async_std::test]
    async fn test_server_error_is_upstream_fetch_error() {
        let family = Family::new("Lato");
        let url = manifest_url(DEFAULT_MANIFEST_URL, &family, weight(400)).unwrap();
        let upstream = Arc::new(StubUpstream::new().with_failure(url, TransportError::Status(503)));
        let resolver = AssetResolver::new(upstream, DEFAULT_MANIFEST_URL);

        let err = resolver
            .resolve(&family, weight(400), Format::Woff2)
            .await
            .unwrap_err();
        assert!(matches!(err, FontError::UpstreamFetch { .. }), "{:?}", err);
    }

    #[async_std::test]
    async fn test_manifest_without_reference_is_resolution_error() {
        let family = Family::new("Lato");
        let url = manifest_url(DEFAULT_MANIFEST_URL, &family, weight(400)).unwrap();
        let upstream = Arc::new(StubUpstream::new().with_text(url, "/* nothing here */"));
        let resolver = AssetResolver::new(upstream, DEFAULT_MANIFEST_URL);

        let err = resolver
            .resolve(&family, weight(400), Format::Ttf)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "resolution");
    }
}
