use fontbundle_core::FontError;
use fontbundle_stem::{ArchiveJob, RequestHandler};
use futures::channel::mpsc;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tide::http::mime;
use tide::{Body, Request, Response, StatusCode};

#[derive(Clone)]
pub struct ApiState {
    pub handler: RequestHandler,
    /// Archive chunks buffered ahead of a slow client.
    pub stream_capacity: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub format: Option<String>,
    pub count: Option<String>,
    pub name: Option<String>,
    pub weights: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct FamilyListResponse<'a> {
    pub object: &'static str,
    pub count: usize,
    pub families: Vec<&'a str>,
}

pub fn error_response(status: u16, message: String) -> tide::Result {
    Ok(Response::builder(status)
        .content_type(mime::JSON)
        .body(serde_json::to_string(&ErrorResponse { error: message })?)
        .build())
}

fn font_error(err: FontError) -> tide::Result {
    log::debug!("Rejected request: [{}] {}", err.kind(), err);
    error_response(err.status_code(), err.to_string())
}

pub async fn download_random(req: Request<ApiState>) -> tide::Result {
    let query: DownloadQuery = req.query()?;
    let state = req.state();

    match state.handler.download_random(
        query.format.as_deref(),
        query.count.as_deref(),
        query.weights.as_deref(),
    ) {
        Ok(job) => Ok(stream_job(state, job)),
        Err(e) => font_error(e),
    }
}

pub async fn download_by_name(req: Request<ApiState>) -> tide::Result {
    let query: DownloadQuery = req.query()?;
    let state = req.state();

    match state.handler.download_by_name(
        query.format.as_deref(),
        query.name.as_deref(),
        query.weights.as_deref(),
    ) {
        Ok(job) => Ok(stream_job(state, job)),
        Err(e) => font_error(e),
    }
}

pub async fn list_families(req: Request<ApiState>) -> tide::Result {
    let catalog = req.state().handler.catalog();
    let families: Vec<&str> = catalog
        .families()
        .iter()
        .map(|family| family.upstream.as_str())
        .collect();

    Ok(Response::builder(StatusCode::Ok)
        .content_type(mime::JSON)
        .body(serde_json::to_string(&FamilyListResponse {
            object: "list",
            count: families.len(),
            families,
        })?)
        .build())
}

/// Starts the job on its own task and returns a response whose body reads
/// the archive as it is produced.
///
/// The status and headers go out before any item is attempted. If the
/// archive writer fails midway the client receives a truncated zip; there is
/// no way to signal an error after the body has started.
fn stream_job(state: &ApiState, job: ArchiveJob) -> Response {
    let (mut tx, rx) = mpsc::channel::<Vec<u8>>(state.stream_capacity.max(1));
    let handler = state.handler.clone();
    let disposition = format!("attachment; filename={}", job.file_name);

    async_std::task::spawn(async move {
        if let Err(e) = handler.stream(&job, &mut tx).await {
            log::error!("Archive {} aborted: {}", job.file_name, e);
        }
    });

    let reader = rx.map(Ok::<_, std::io::Error>).into_async_read();
    Response::builder(StatusCode::Ok)
        .content_type("application/zip")
        .header("Content-Disposition", disposition)
        .body(Body::from_reader(reader, None))
        .build()
}
