//! `POST /api/objects/csv/preview`.
//!
//! Parses the uploaded file (any extension; `.csv` is expected but not enforced), opens an
//! import session for it and returns an `ImportPreview`. Nothing is written to the store.

use crate::catalog::delimited::{SourceError, SourceTable};
use crate::catalog::session::ImportSessions;
use crate::catalog::view::LiveView;
use crate::catalog::{require_superadmin, Catalog, CatalogError};
use crate::services::upload::{read_file_part, UploadError};
use crate::services::{acting_user, catalog_error_response};
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::model::csv::ImportPreview;
use log::info;
use thiserror::Error;

/// Data rows included in the preview.
const PREVIEW_ROWS: usize = 5;
const MAX_CSV_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Error)]
enum PreviewError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

pub(crate) async fn process(
    req: HttpRequest,
    payload: Multipart,
    catalog: web::Data<Catalog>,
    view: web::Data<LiveView>,
    sessions: web::Data<ImportSessions>,
) -> impl Responder {
    match preview_upload(&req, payload, &catalog, &view, &sessions).await {
        Ok(preview) => HttpResponse::Ok().json(preview),
        Err(PreviewError::Catalog(e)) => catalog_error_response(&e),
        Err(e) => HttpResponse::BadRequest().body(format!("Error: {}", e)),
    }
}

async fn preview_upload(
    req: &HttpRequest,
    payload: Multipart,
    catalog: &Catalog,
    view: &LiveView,
    sessions: &ImportSessions,
) -> Result<ImportPreview, PreviewError> {
    let user = acting_user(req, catalog).map_err(CatalogError::from)?;
    require_superadmin(&user)?;

    let upload = read_file_part(payload, MAX_CSV_BYTES).await?;
    let table = SourceTable::from_bytes(upload.bytes)?;
    info!(
        "Parsed '{}': {} headers, {} data rows, delimiter '{}'",
        upload.filename,
        table.headers.len(),
        table.total_rows,
        table.delimiter.as_char()
    );

    let headers = table.headers.clone();
    let preview_rows = table.preview_rows(PREVIEW_ROWS);
    let total_rows = table.total_rows;
    let delimiter = table.delimiter;
    let session_id = sessions.open(table).await;

    Ok(ImportPreview {
        session_id,
        headers,
        preview_rows,
        total_rows,
        delimiter,
        known_fields: view.current().field_order.clone(),
    })
}
