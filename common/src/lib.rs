//! Types shared between the catalog server and its clients.
//!
//! - `model`: records, field configuration, users, CSV previews and import outcomes.
//! - `jobs`: status of background jobs as reported by the status endpoint.
//! - `requests`: JSON payloads accepted by the HTTP API.

pub mod jobs;
pub mod model;
pub mod requests;
