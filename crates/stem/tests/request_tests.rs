use fontbundle_core::config::DEFAULT_MANIFEST_URL;
use fontbundle_core::FontError;
use fontbundle_stem::{ArchiveAssembler, RequestHandler};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;
use typecrab::{AssetCache, AssetResolver, FamilyCatalog, StubUpstream};

const WEIGHTS: [u16; 3] = [400, 700, 900];

fn setup(families: &[&str], root: &std::path::Path) -> (RequestHandler, Arc<StubUpstream>) {
    let mut upstream = StubUpstream::new();
    for family in families {
        upstream = upstream.with_family(family, &WEIGHTS);
    }
    let upstream = Arc::new(upstream);
    let resolver = AssetResolver::new(upstream.clone(), DEFAULT_MANIFEST_URL);
    let cache = AssetCache::new(root, resolver, upstream.clone());
    let handler = RequestHandler::new(
        Arc::new(FamilyCatalog::new(families.iter().copied())),
        ArchiveAssembler::new(cache, 4),
    );
    (handler, upstream)
}

fn entry_names(chunks: Vec<Vec<u8>>) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(chunks.concat())).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn numbered(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Family {}", i)).collect()
}

#[test]
fn test_random_selects_distinct_families() {
    let dir = tempfile::tempdir().unwrap();
    let names = numbered(30);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (handler, upstream) = setup(&refs, dir.path());

    let job = handler
        .download_random(Some("woff2"), Some("10"), None)
        .unwrap();
    let unique: HashSet<_> = job.families.iter().map(|f| f.name.clone()).collect();
    assert_eq!(job.families.len(), 10);
    assert_eq!(unique.len(), 10);
    assert_eq!(job.weights.len(), 9);
    assert!(job.file_name.starts_with("fonts-woff2-"));
    assert!(job.file_name.ends_with(".zip"));
    assert_eq!(upstream.requests(), 0);
}

#[test]
fn test_random_rejects_bad_counts() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, upstream) = setup(&["Lato"], dir.path());

    for count in ["15", "101", "0", "abc"] {
        let err = handler
            .download_random(Some("ttf"), Some(count), None)
            .unwrap_err();
        assert!(matches!(err, FontError::Validation(_)), "count {}", count);
    }
    assert_eq!(upstream.requests(), 0);
}

#[test]
fn test_invalid_format_makes_no_requests() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, upstream) = setup(&["Lato"], dir.path());

    let random = handler.download_random(Some("otf"), Some("10"), None);
    let named = handler.download_by_name(Some("otf"), Some("Lato"), None);
    assert!(matches!(random, Err(FontError::Validation(_))));
    assert!(matches!(named, Err(FontError::Validation(_))));
    assert_eq!(upstream.requests(), 0);
}

#[test]
fn test_by_name_requires_name() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, _) = setup(&["Lato"], dir.path());

    for name in [None, Some(""), Some("   ")] {
        let err = handler.download_by_name(Some("ttf"), name, None).unwrap_err();
        assert_eq!(err.status_code(), 400, "{:?}", name);
    }
}

#[test]
fn test_by_name_unknown_family() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, _) = setup(&["Lato"], dir.path());

    let err = handler
        .download_by_name(Some("ttf"), Some("comic neue"), None)
        .unwrap_err();
    assert!(matches!(err, FontError::NotFound(ref name) if name == "Comic Neue"));
    assert_eq!(err.status_code(), 404);
}

#[async_std::test]
async fn test_by_name_streams_resolved_weights() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, _) = setup(&["Open Sans"], dir.path());

    let job = handler
        .download_by_name(Some("woff2"), Some("open sans"), Some("700,400,300"))
        .unwrap();
    assert_eq!(job.file_name, "Open-Sans-woff2.zip");

    let mut sink: Vec<Vec<u8>> = Vec::new();
    let report = handler.stream(&job, &mut sink).await.unwrap();

    // 300 is not served by the stub upstream.
    assert_eq!(report.stored(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(
        entry_names(sink),
        vec![
            "Open-Sans/Open-Sans-400.woff2".to_string(),
            "Open-Sans/Open-Sans-700.woff2".to_string(),
        ]
    );
}

#[async_std::test]
async fn test_second_request_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, upstream) = setup(&["Lato"], dir.path());
    let job = handler
        .download_by_name(Some("ttf"), Some("Lato"), Some("400,700,900"))
        .unwrap();

    let mut first: Vec<Vec<u8>> = Vec::new();
    handler.stream(&job, &mut first).await.unwrap();
    let after_first = upstream.requests();
    assert_eq!(after_first, 6);

    let mut second: Vec<Vec<u8>> = Vec::new();
    handler.stream(&job, &mut second).await.unwrap();
    assert_eq!(upstream.requests(), after_first);
    assert_eq!(entry_names(first), entry_names(second));
    assert!(dir.path().join("Lato").join("Lato-900.ttf").exists());
}
