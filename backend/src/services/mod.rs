//! HTTP API.
//!
//! Each sub-module exposes a `configure_routes()` scope; handlers are `process` functions that
//! delegate to an inner function returning a `Result` and turn it into an `HttpResponse`.
//!
//! The acting user is taken from the `X-User-Id` header set by the identity proxy in front of
//! the service (`X-User-Email` and `X-User-Name` are used when the user is first seen). The
//! role always comes from the user directory, never from the request.

pub mod images;
pub mod objects;
pub mod upload;
pub mod users;

use crate::catalog::import::ImportError;
use crate::catalog::{Catalog, CatalogError};
use crate::store::blob::BlobError;
use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use common::model::user::ActingUser;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";
pub const USER_NAME_HEADER: &str = "X-User-Name";

fn header(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves the acting user, registering ids the directory has not seen yet with no access.
pub fn acting_user(req: &HttpRequest, catalog: &Catalog) -> Result<ActingUser, StoreError> {
    let Some(id) = header(req, USER_ID_HEADER) else {
        return Ok(ActingUser::anonymous());
    };
    let user = match catalog.users().get_user(&id)? {
        Some(user) => user,
        None => {
            let email = header(req, USER_EMAIL_HEADER).unwrap_or_default();
            let name = header(req, USER_NAME_HEADER).unwrap_or_else(|| id.clone());
            log::info!("Registering new user {}", id);
            catalog.users().ensure_user(&id, &email, &name)?
        }
    };
    Ok(ActingUser {
        id: user.id,
        role: user.role,
    })
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Rejected(_) => StatusCode::BAD_REQUEST,
        StoreError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn store_error_response(error: &StoreError) -> HttpResponse {
    HttpResponse::build(store_status(error)).body(format!("Error: {}", error))
}

pub fn catalog_error_response(error: &CatalogError) -> HttpResponse {
    let status = match error {
        CatalogError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CatalogError::Forbidden => StatusCode::FORBIDDEN,
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Invalid(_) | CatalogError::TooManyImages => StatusCode::BAD_REQUEST,
        CatalogError::Store(e) => store_status(e),
        CatalogError::Blob(BlobError::NotFound(_)) => StatusCode::NOT_FOUND,
        CatalogError::Blob(BlobError::InvalidReference(_)) => StatusCode::BAD_REQUEST,
        CatalogError::Blob(BlobError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    HttpResponse::build(status).body(format!("Error: {}", error))
}

pub fn import_error_response(error: &ImportError) -> HttpResponse {
    let status = match error {
        ImportError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ImportError::Forbidden => StatusCode::FORBIDDEN,
        ImportError::MalformedSource(_) => StatusCode::BAD_REQUEST,
        ImportError::Store { source, .. } => store_status(source),
    };
    HttpResponse::build(status).body(format!("Error: {}", error))
}
