use crate::spool::Spool;
use fontbundle_core::{CacheKey, Family, FontError, Format, ItemOutcome, JobReport, Result, Weight};
use futures::sink::{Sink, SinkExt};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::Write;
use typecrab::AssetCache;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn archive_error(e: impl Display) -> FontError {
    FontError::Archive(e.to_string())
}

/// Streams one zip archive per job, isolating per item failures.
#[derive(Clone)]
pub struct ArchiveAssembler {
    cache: AssetCache,
    parallelism: usize,
}

impl ArchiveAssembler {
    pub fn new(cache: AssetCache, parallelism: usize) -> Self {
        Self {
            cache,
            parallelism: parallelism.max(1),
        }
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Fetches every (family, weight) pair through the cache and writes the
    /// successes into a zip archive sent chunk by chunk into `sink`.
    ///
    /// Entries are ordered by family then weight and named
    /// `Family-Slug/Family-Slug-<weight>.<ext>`. Up to `parallelism` cache
    /// fills run ahead of the writer; a slow sink pauses them. Item failures
    /// are recorded in the report and skipped. Only a failing sink or archive
    /// writer stops the job, after which the consumer holds a truncated archive.
    pub async fn build<S>(
        &self,
        families: &[Family],
        weights: &BTreeSet<Weight>,
        format: Format,
        sink: &mut S,
    ) -> Result<JobReport>
    where
        S: Sink<Vec<u8>> + Unpin,
        S::Error: Display,
    {
        let keys: Vec<CacheKey> = families
            .iter()
            .flat_map(|family| {
                weights
                    .iter()
                    .map(move |&weight| CacheKey::new(family.clone(), weight, format))
            })
            .collect();

        let spool = Spool::new();
        let mut zip = ZipWriter::new(spool.clone());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut report = JobReport::default();

        let mut fills = stream::iter(keys)
            .map(|key| async move {
                let bytes = self.fetch(&key).await;
                (key, bytes)
            })
            .buffered(self.parallelism);

        while let Some((key, fetched)) = fills.next().await {
            let bytes = match fetched {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!(
                        "Skipping {} {} {}: [{}] {}",
                        key.family.name,
                        key.weight,
                        key.format,
                        e.kind(),
                        e
                    );
                    report.record(ItemOutcome::failed(&key, &e));
                    continue;
                }
            };

            // Bytes before this entry's header are final once it starts.
            let mark = spool.position().map_err(archive_error)?;
            zip.start_file(key.entry_name(), options)
                .map_err(archive_error)?;
            zip.write_all(&bytes).map_err(archive_error)?;
            report.record(ItemOutcome::stored(&key, bytes.len() as u64));

            let head = spool.drain_to(mark).map_err(archive_error)?;
            send(sink, head).await?;
        }

        zip.finish().map_err(archive_error)?;
        let tail = spool.drain_all().map_err(archive_error)?;
        send(sink, tail).await?;
        sink.close().await.map_err(archive_error)?;

        Ok(report)
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Vec<u8>> {
        self.cache.get(key).await?.read().await
    }
}

async fn send<S>(sink: &mut S, chunk: Vec<u8>) -> Result<()>
where
    S: Sink<Vec<u8>> + Unpin,
    S::Error: Display,
{
    if chunk.is_empty() {
        return Ok(());
    }
    sink.send(chunk)
        .await
        .map_err(|e| FontError::Archive(format!("sink closed: {}", e)))
}
