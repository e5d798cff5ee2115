//! `GET /api/objects/csv/export`: downloads the collection as `{dataset}.csv`.
//!
//! Columns follow the reconciled field order (the open session's headers with
//! `?session=<id>`). Output is always comma separated, whatever the import delimiter was.

use crate::catalog::export::{export_records, ExportError};
use crate::catalog::session::ImportSessions;
use crate::catalog::view::LiveView;
use crate::catalog::{require_view, Catalog, CatalogError};
use crate::config::AppConfig;
use crate::services::{acting_user, catalog_error_response};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct ExportQuery {
    pub session: Option<String>,
}

pub(crate) async fn process(
    req: HttpRequest,
    query: web::Query<ExportQuery>,
    catalog: web::Data<Catalog>,
    view: web::Data<LiveView>,
    sessions: web::Data<ImportSessions>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let authorized = acting_user(&req, &catalog)
        .map_err(CatalogError::from)
        .and_then(|user| require_view(&user));
    if let Err(e) = authorized {
        return catalog_error_response(&e);
    }

    let headers = match &query.session {
        Some(id) => sessions.headers(id).await,
        None => None,
    };
    let snapshot = view.current();
    let field_order = snapshot.field_order_for(headers.as_deref());

    match export_records(&snapshot.records, &field_order) {
        Ok(text) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(format!("{}.csv", config.dataset))],
            })
            .body(text),
        Err(e @ ExportError::NothingToExport) => HttpResponse::NotFound().body(e.to_string()),
        Err(e) => HttpResponse::InternalServerError().body(format!("Error: {}", e)),
    }
}
