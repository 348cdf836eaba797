//! HTTP surface of the archiver: a single upload endpoint.

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use tower_http::trace::TraceLayer;

use crate::error::ArchiverError;
use crate::pipeline::Archiver;

/// Uploads may carry full release artifacts; 256 MiB covers any sane
/// package while still bounding memory per request.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The upload pipeline.
    pub archiver: Arc<Archiver>,
}

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/packages", post(upload_package))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /packages`: multipart form with fields `package` (container bytes)
/// and `packageAsc` (detached maintainer signature over those bytes).
async fn upload_package(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<StatusCode, ArchiverError> {
    let mut package: Option<Vec<u8>> = None;
    let mut package_asc: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("package") => {
                if let Some(name) = field.file_name() {
                    tracing::info!(package = %name, "handling package");
                }
                package = Some(field.bytes().await?.to_vec());
            }
            Some("packageAsc") => package_asc = Some(field.bytes().await?.to_vec()),
            _ => {}
        }
    }

    let package = package.ok_or(ArchiverError::MissingPart("package"))?;
    let package_asc = package_asc.ok_or(ArchiverError::MissingPart("packageAsc"))?;

    state.archiver.handle_upload(&package, &package_asc).await?;
    Ok(StatusCode::OK)
}
