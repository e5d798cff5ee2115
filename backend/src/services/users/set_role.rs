use crate::catalog::{require_superadmin, Catalog, CatalogError};
use crate::services::{acting_user, catalog_error_response};
use crate::store::StoreError;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::model::user::Role;
use common::requests::RoleChangeRequest;
use log::info;

pub(crate) async fn process(
    req: HttpRequest,
    user_id: web::Path<String>,
    catalog: web::Data<Catalog>,
    body: web::Json<RoleChangeRequest>,
) -> impl Responder {
    match set_role(&req, &user_id, body.role, &catalog) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => catalog_error_response(&e),
    }
}

fn set_role(
    req: &HttpRequest,
    target: &str,
    role: Role,
    catalog: &Catalog,
) -> Result<(), CatalogError> {
    let user = acting_user(req, catalog)?;
    require_superadmin(&user)?;
    if user.id == target {
        return Err(CatalogError::Invalid(
            "You cannot change your own role".to_string(),
        ));
    }
    catalog.users().set_role(target, role).map_err(|e| match e {
        StoreError::NotFound(_) => CatalogError::NotFound(format!("user {}", target)),
        other => other.into(),
    })?;
    info!("{} set the role of {} to '{}'", user.id, target, role.as_str());
    Ok(())
}
