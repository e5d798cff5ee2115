//! Image attachments of an object.
//!
//! - `POST /api/objects/{object_id}/images`: multipart upload, part `file`. At most three images
//!   per object.
//! - `DELETE /api/objects/{object_id}/images?reference=...`: drops the reference and deletes the
//!   blob best-effort.

use crate::catalog::Catalog;
use crate::services::upload::read_file_part;
use crate::services::{acting_user, catalog_error_response};
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub(crate) async fn upload(
    req: HttpRequest,
    object_id: web::Path<String>,
    catalog: web::Data<Catalog>,
    payload: Multipart,
) -> impl Responder {
    let user = match acting_user(&req, &catalog) {
        Ok(user) => user,
        Err(e) => return catalog_error_response(&e.into()),
    };
    let upload = match read_file_part(payload, MAX_IMAGE_BYTES).await {
        Ok(upload) => upload,
        Err(e) => return HttpResponse::BadRequest().body(format!("Error: {}", e)),
    };
    match catalog.add_image(&user, &object_id, &upload.filename, &upload.bytes) {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => catalog_error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct ImageQuery {
    pub reference: String,
}

pub(crate) async fn remove(
    req: HttpRequest,
    object_id: web::Path<String>,
    query: web::Query<ImageQuery>,
    catalog: web::Data<Catalog>,
) -> impl Responder {
    let result = acting_user(&req, &catalog)
        .map_err(Into::into)
        .and_then(|user| catalog.remove_image(&user, &object_id, &query.reference));
    match result {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => catalog_error_response(&e),
    }
}
