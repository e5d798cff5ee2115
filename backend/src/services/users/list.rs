use crate::catalog::{require_superadmin, Catalog, CatalogError};
use crate::services::{acting_user, catalog_error_response};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::model::user::User;

pub(crate) async fn process(req: HttpRequest, catalog: web::Data<Catalog>) -> impl Responder {
    match list_users(&req, &catalog) {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(e) => catalog_error_response(&e),
    }
}

fn list_users(req: &HttpRequest, catalog: &Catalog) -> Result<Vec<User>, CatalogError> {
    let user = acting_user(req, catalog)?;
    require_superadmin(&user)?;
    Ok(catalog.users().list_users()?)
}
