//! # Ofonts: The Voice
//! HTTP surface for fontbundle: streams zip bundles of web font assets picked
//! at random or by family name.

pub mod api;

use api::{download_by_name, download_random, error_response, list_families, ApiState};
use tide::utils::After;
use tide::Response;

/// Builds the HTTP application.
///
/// Errors raised by the framework itself (query parsing, panicking routes)
/// are rewritten into the same `{ "error": ".." }` body the routes use.
pub fn server(state: ApiState) -> tide::Server<ApiState> {
    let mut app = tide::with_state(state);

    app.with(After(|res: Response| async move {
        match res.error().map(|err| err.to_string()) {
            Some(message) => error_response(res.status().into(), message),
            None => Ok(res),
        }
    }));

    app.at("/download-random").get(download_random);
    app.at("/download-by-name").get(download_by_name);
    app.at("/families").get(list_families);

    app
}
