//! In-memory upstream for tests and offline runs.

use crate::resolver::manifest_url;
use crate::transport::{TransportError, Upstream};
use async_trait::async_trait;
use fontbundle_core::config::{DEFAULT_DIRECTORY_URL, DEFAULT_MANIFEST_URL};
use fontbundle_core::{Family, Format, Weight};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const ASSET_HOST: &str = "https://fonts.gstatic.com/s";

#[derive(Clone)]
enum Reply {
    Text(String),
    Bytes(Vec<u8>),
    Fail(TransportError),
}

/// Serves canned replies keyed by exact URL and counts every request.
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct StubUpstream {
    replies: Mutex<HashMap<String, Reply>>,
    hits: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.set(url.into(), Reply::Text(body.into()));
        self
    }

    pub fn with_bytes(self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.set(url.into(), Reply::Bytes(body));
        self
    }

    pub fn with_failure(self, url: impl Into<String>, error: TransportError) -> Self {
        self.set(url.into(), Reply::Fail(error));
        self
    }

    /// Directory listing at the default directory URL, in the given order.
    pub fn with_directory(self, families: &[&str]) -> Self {
        let items: Vec<_> = families
            .iter()
            .map(|family| serde_json::json!({ "family": family, "category": "sans-serif" }))
            .collect();
        let body = serde_json::json!({ "kind": "webfonts#webfontList", "items": items });
        self.with_text(
            format!("{}?sort=popularity", DEFAULT_DIRECTORY_URL),
            body.to_string(),
        )
    }

    /// Manifests and asset bytes for `family` at each weight, in both formats,
    /// at the default manifest URL.
    pub fn with_family(self, family: &str, weights: &[u16]) -> Self {
        let family = Family::new(family);
        for &value in weights {
            let Some(weight) = Weight::new(value) else {
                continue;
            };
            let Ok(url) = manifest_url(DEFAULT_MANIFEST_URL, &family, weight) else {
                continue;
            };
            let mut manifest = String::new();
            for format in Format::ALL {
                let asset = asset_url(&family, weight, format);
                manifest.push_str(&format!(
                    "@font-face {{\n  font-family: '{}';\n  font-style: normal;\n  \
                     font-weight: {};\n  src: url({}) format('{}');\n}}\n",
                    family.upstream,
                    weight,
                    asset,
                    format.extension()
                ));
                self.set(asset, Reply::Bytes(asset_bytes(&family, weight, format)));
            }
            self.set(url, Reply::Text(manifest));
        }
        self
    }

    pub fn requests(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.hits
            .lock()
            .map(|hits| hits.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn set(&self, url: String, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.insert(url, reply);
        }
    }

    fn reply(&self, url: &str) -> Reply {
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut hits) = self.hits.lock() {
            *hits.entry(url.to_string()).or_default() += 1;
        }
        self.replies
            .lock()
            .ok()
            .and_then(|replies| replies.get(url).cloned())
            .unwrap_or(Reply::Fail(TransportError::Status(404)))
    }
}

/// Asset URL the stub advertises for a family/weight/format.
pub fn asset_url(family: &Family, weight: Weight, format: Format) -> String {
    format!(
        "{}/{}/v1/{}-{}.{}",
        ASSET_HOST,
        family.name.slug().to_lowercase(),
        family.name.slug(),
        weight,
        format.extension()
    )
}

/// Bytes the stub serves for an asset; distinct per key.
pub fn asset_bytes(family: &Family, weight: Weight, format: Format) -> Vec<u8> {
    format!("{}:{}:{}", family.name, weight, format).into_bytes()
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn fetch_text(
        &self,
        url: &str,
        _user_agent: Option<&str>,
    ) -> Result<String, TransportError> {
        match self.reply(url) {
            Reply::Text(body) => Ok(body),
            Reply::Bytes(bytes) => String::from_utf8(bytes)
                .map_err(|e| TransportError::Network(e.to_string())),
            Reply::Fail(error) => Err(error),
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        match self.reply(url) {
            Reply::Text(body) => Ok(body.into_bytes()),
            Reply::Bytes(bytes) => Ok(bytes),
            Reply::Fail(error) => Err(error),
        }
    }
}
