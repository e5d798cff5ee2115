use crate::catalog::Catalog;
use crate::services::{acting_user, catalog_error_response};
use actix_web::{web, HttpRequest, HttpResponse, Responder};

/// `GET /api/objects/{object_id}`: the record with resolved image URLs.
pub(crate) async fn process(
    req: HttpRequest,
    object_id: web::Path<String>,
    catalog: web::Data<Catalog>,
) -> impl Responder {
    let result = acting_user(&req, &catalog)
        .map_err(Into::into)
        .and_then(|user| catalog.object_detail(&user, &object_id));
    match result {
        Ok(detail) => HttpResponse::Ok().json(detail),
        Err(e) => catalog_error_response(&e),
    }
}
