use crate::catalog::session::ImportSessions;
use crate::catalog::{require_superadmin, Catalog};
use crate::services::{acting_user, catalog_error_response};
use actix_web::{web, HttpRequest, HttpResponse, Responder};

/// `DELETE /api/objects/csv/sessions/{session_id}`: the operator closed the import dialog.
pub(crate) async fn close(
    req: HttpRequest,
    session_id: web::Path<String>,
    catalog: web::Data<Catalog>,
    sessions: web::Data<ImportSessions>,
) -> impl Responder {
    let authorized = acting_user(&req, &catalog)
        .map_err(Into::into)
        .and_then(|user| require_superadmin(&user));
    if let Err(e) = authorized {
        return catalog_error_response(&e);
    }
    if sessions.close(&session_id).await {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::NotFound().body("Import session not found")
    }
}
