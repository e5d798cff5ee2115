//! CSV import and export of the object collection.
//!
//! Importing takes two steps. The file is first uploaded to `/preview`, which parses it, keeps
//! it in an import session and answers with the detected headers, delimiter and a few rows.
//! The operator then picks the filterable and searchable fields and posts them to `/import`,
//! which runs the import as a background job and returns its id right away. Clients poll
//! `/status/{job_id}` until the job is `Completed` (with an `ImportReport`) or `Failed`.
//!
//! Routes:
//! - `POST /api/objects/csv/preview`: multipart upload, part `file`. Superadmin only.
//! - `DELETE /api/objects/csv/sessions/{session_id}`: discards an import session.
//! - `POST /api/objects/csv/import`: `ImportRequest` body, returns the job id.
//! - `GET /api/objects/csv/status/{job_id}`: current `JobStatus`.
//! - `GET /api/objects/csv/export`: the whole collection as a comma separated file.

use actix_web::web::{delete, get, post, scope};
use actix_web::Scope;

mod export;
mod get_status;
mod import;
mod preview;
mod sessions;

pub fn configure_routes() -> Scope {
    scope("/csv")
        .route("/preview", post().to(preview::process))
        .route("/sessions/{session_id}", delete().to(sessions::close))
        .route("/import", post().to(import::process))
        .route("/status/{job_id}", get().to(get_status::process))
        .route("/export", get().to(export::process))
}
