use crate::archive::ArchiveAssembler;
use fontbundle_core::policy::{parse_weights, validate_count, validate_format};
use fontbundle_core::{Family, FamilyName, FontError, Format, JobReport, Result, Weight};
use futures::sink::Sink;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use typecrab::FamilyCatalog;

/// A validated request, ready to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    pub families: Vec<Family>,
    pub weights: BTreeSet<Weight>,
    pub format: Format,
    /// Download name offered to the client.
    pub file_name: String,
}

/// Entry point for both download operations.
///
/// `download_random` and `download_by_name` only validate and select; they
/// never touch the network, so their errors can still decide the response
/// status. `stream` then runs the job against a sink.
#[derive(Clone)]
pub struct RequestHandler {
    catalog: Arc<FamilyCatalog>,
    assembler: ArchiveAssembler,
}

impl RequestHandler {
    pub fn new(catalog: Arc<FamilyCatalog>, assembler: ArchiveAssembler) -> Self {
        Self { catalog, assembler }
    }

    pub fn catalog(&self) -> &FamilyCatalog {
        &self.catalog
    }

    pub fn download_random(
        &self,
        format: Option<&str>,
        count: Option<&str>,
        weights: Option<&str>,
    ) -> Result<ArchiveJob> {
        let format = validate_format(format)?;
        let count = validate_count(count)?;
        let weights = parse_weights(weights);

        Ok(ArchiveJob {
            families: self.catalog.sample(count),
            weights,
            format,
            file_name: format!("fonts-{}-{}.zip", format, timestamp_millis()),
        })
    }

    pub fn download_by_name(
        &self,
        format: Option<&str>,
        name: Option<&str>,
        weights: Option<&str>,
    ) -> Result<ArchiveJob> {
        let format = validate_format(format)?;
        let name = FamilyName::new(name.unwrap_or_default());
        if name.is_empty() {
            return Err(FontError::validation("Font name is required"));
        }
        let family = self
            .catalog
            .lookup(&name)
            .cloned()
            .ok_or_else(|| FontError::NotFound(name.to_string()))?;

        Ok(ArchiveJob {
            file_name: format!("{}-{}.zip", family.name.slug(), format),
            families: vec![family],
            weights: parse_weights(weights),
            format,
        })
    }

    pub async fn stream<S>(&self, job: &ArchiveJob, sink: &mut S) -> Result<JobReport>
    where
        S: Sink<Vec<u8>> + Unpin,
        S::Error: Display,
    {
        log::info!(
            "Building {} ({} families x {} weights)",
            job.file_name,
            job.families.len(),
            job.weights.len()
        );
        let report = self
            .assembler
            .build(&job.families, &job.weights, job.format, sink)
            .await?;

        if report.stored() == 0 {
            log::warn!(
                "{} finished with no entries ({} items failed)",
                job.file_name,
                report.failed()
            );
        } else {
            log::info!(
                "{} finished: {} stored, {} failed",
                job.file_name,
                report.stored(),
                report.failed()
            );
        }
        Ok(report)
    }
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
