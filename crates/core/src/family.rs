use serde::{Deserialize, Serialize};
use std::fmt;

/// A family name in canonical form: every whitespace separated word
/// capitalized, words joined by single spaces.
///
/// ```
/// use fontbundle_core::FamilyName;
///
/// let name = FamilyName::new("  roboto   CONDENSED ");
/// assert_eq!(name.as_str(), "Roboto Condensed");
/// assert_eq!(name.slug(), "Roboto-Condensed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyName(String);

impl FamilyName {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hyphenated form used for cache directories, file names and archive entries.
    pub fn slug(&self) -> String {
        self.0.replace(' ', "-")
    }

    /// Whether the slug is usable as one path component below the cache root.
    pub fn is_path_safe(&self) -> bool {
        let slug = self.slug();
        !slug.is_empty()
            && slug != "."
            && slug != ".."
            && !slug.chars().any(|c| c == '/' || c == '\\' || c.is_control())
    }
}

impl fmt::Display for FamilyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalizes a raw family string. Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// A catalog member: its canonical name plus the spelling the upstream
/// services expect (`IBM Plex Sans` for the canonical `Ibm Plex Sans`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Family {
    pub name: FamilyName,
    pub upstream: String,
}

impl Family {
    pub fn new(upstream: &str) -> Self {
        Self {
            name: FamilyName::new(upstream),
            upstream: upstream.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_capitalizes_words() {
        assert_eq!(normalize("roboto condensed"), "Roboto Condensed");
        assert_eq!(normalize("OPEN sans"), "Open Sans");
        assert_eq!(normalize("  lato\t"), "Lato");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["roboto condensed", "IBM Plex  Sans", "noto sans jp", "  a  b  "] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input {:?}", raw);
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(FamilyName::new("open sans").slug(), "Open-Sans");
        assert_eq!(FamilyName::new("Roboto").slug(), "Roboto");
    }

    #[test]
    fn test_path_safety() {
        for ok in ["Roboto", "Open Sans", "M PLUS 1p", "Noto Sans 2.0"] {
            assert!(FamilyName::new(ok).is_path_safe(), "{:?}", ok);
        }
        for bad in ["", "..", ".", "../etc", "a/b", "back\\slash", "nul\0byte"] {
            assert!(!FamilyName::new(bad).is_path_safe(), "{:?}", bad);
        }
    }

    #[test]
    fn test_family_keeps_upstream_spelling() {
        let family = Family::new("IBM  Plex Sans");
        assert_eq!(family.upstream, "IBM Plex Sans");
        assert_eq!(family.name.as_str(), "Ibm Plex Sans");
    }
}
