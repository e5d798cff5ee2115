//! `POST /api/objects` and `PUT /api/objects/{object_id}`.
//!
//! Both take an `ObjectPayload`. Values are trimmed before they are stored; an update merges
//! the given fields into the record and leaves the others alone.

use crate::catalog::Catalog;
use crate::services::{acting_user, catalog_error_response};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::requests::ObjectPayload;

pub(crate) async fn create(
    req: HttpRequest,
    catalog: web::Data<Catalog>,
    payload: web::Json<ObjectPayload>,
) -> impl Responder {
    let result = acting_user(&req, &catalog)
        .map_err(Into::into)
        .and_then(|user| catalog.create_object(&user, payload.into_inner().fields));
    match result {
        Ok(record) => HttpResponse::Created().json(record),
        Err(e) => catalog_error_response(&e),
    }
}

pub(crate) async fn update(
    req: HttpRequest,
    object_id: web::Path<String>,
    catalog: web::Data<Catalog>,
    payload: web::Json<ObjectPayload>,
) -> impl Responder {
    let result = acting_user(&req, &catalog)
        .map_err(Into::into)
        .and_then(|user| catalog.update_object(&user, &object_id, payload.into_inner().fields));
    match result {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => catalog_error_response(&e),
    }
}
