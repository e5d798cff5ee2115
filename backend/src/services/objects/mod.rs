//! # Object Service Module
//!
//! Routes under `/api/objects`: listing, single-object retrieval and maintenance, image
//! attachments, and the CSV import/export endpoints (`csv`).
//!
//! The `csv` scope and `/fields` are registered before `/{object_id}` so their paths are never
//! taken for an object id.

pub mod csv;
mod delete;
mod fields;
mod get;
mod images;
mod list;
mod save;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/objects";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .service(csv::configure_routes())
        .route("", get().to(list::process))
        .route("", post().to(save::create))
        .route("/fields", get().to(fields::process))
        .route("/{object_id}", get().to(get::process))
        .route("/{object_id}", put().to(save::update))
        .route("/{object_id}", delete().to(delete::process))
        .route("/{object_id}/images", post().to(images::upload))
        .route("/{object_id}/images", delete().to(images::remove))
}
