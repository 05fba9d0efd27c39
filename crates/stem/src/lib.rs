//! Archive jobs: selecting families for a request and streaming their assets
//! as one zip archive.

pub mod archive;
pub mod handler;
mod spool;

pub use archive::ArchiveAssembler;
pub use handler::{ArchiveJob, RequestHandler};
