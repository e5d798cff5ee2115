//! `GET /api/images/{reference}`: serves an image blob with a MIME type guessed from its name.

use crate::catalog::{require_view, Catalog, CatalogError};
use crate::services::{acting_user, catalog_error_response};
use actix_web::web::{get, scope};
use actix_web::{web, HttpRequest, HttpResponse, Responder, Scope};
use mime_guess::from_path;

const API_PATH: &str = "/api/images";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/{reference:.*}", get().to(process))
}

async fn process(
    req: HttpRequest,
    reference: web::Path<String>,
    catalog: web::Data<Catalog>,
) -> impl Responder {
    match read_image(&req, &reference, &catalog) {
        Ok(bytes) => {
            let mime = from_path(reference.as_str()).first_or_octet_stream();
            HttpResponse::Ok().content_type(mime.as_ref()).body(bytes)
        }
        Err(e) => catalog_error_response(&e),
    }
}

fn read_image(req: &HttpRequest, reference: &str, catalog: &Catalog) -> Result<Vec<u8>, CatalogError> {
    let user = acting_user(req, catalog)?;
    require_view(&user)?;
    Ok(catalog.blobs().read(reference)?)
}
