use crate::catalog::Catalog;
use crate::services::{acting_user, catalog_error_response};
use actix_web::{web, HttpRequest, HttpResponse, Responder};

/// `DELETE /api/objects/{object_id}`. Image blobs are removed best-effort before the record.
pub(crate) async fn process(
    req: HttpRequest,
    object_id: web::Path<String>,
    catalog: web::Data<Catalog>,
) -> impl Responder {
    let result = acting_user(&req, &catalog)
        .map_err(Into::into)
        .and_then(|user| catalog.delete_object(&user, &object_id));
    match result {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => catalog_error_response(&e),
    }
}
