//! `GET /api/objects/fields`: the field layout clients build forms, tables and filters from.
//!
//! With `?session=<id>` the order is the one of the open import session's headers.

use crate::catalog::session::ImportSessions;
use crate::catalog::view::LiveView;
use crate::catalog::{require_view, Catalog, CatalogError};
use crate::services::{acting_user, catalog_error_response};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LayoutQuery {
    pub session: Option<String>,
}

pub(crate) async fn process(
    req: HttpRequest,
    query: web::Query<LayoutQuery>,
    catalog: web::Data<Catalog>,
    view: web::Data<LiveView>,
    sessions: web::Data<ImportSessions>,
) -> impl Responder {
    if let Err(e) = authorize(&req, &catalog) {
        return catalog_error_response(&e);
    }
    let headers = match &query.session {
        Some(id) => sessions.headers(id).await,
        None => None,
    };
    HttpResponse::Ok().json(view.current().layout(headers.as_deref()))
}

fn authorize(req: &HttpRequest, catalog: &Catalog) -> Result<(), CatalogError> {
    let user = acting_user(req, catalog)?;
    require_view(&user)
}

#[cfg(test)]
mod tests {
    use crate::catalog::delimited::SourceTable;
    use crate::services::testing::{Harness, VIEWER};
    use crate::services::USER_ID_HEADER;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn layout_follows_an_open_session() {
        let harness = Harness::new();
        let table = SourceTable::parse("museographicIndex,state_of-preservation\n1,good".into())
            .unwrap();
        let session = harness.sessions.open(table).await;
        let app = test::init_service(App::new().configure(|cfg| harness.configure(cfg))).await;

        let req = test::TestRequest::get()
            .uri("/api/objects/fields")
            .insert_header((USER_ID_HEADER, VIEWER))
            .to_request();
        let layout: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(layout["fields"].as_array().unwrap().len(), 0);

        let req = test::TestRequest::get()
            .uri(&format!("/api/objects/fields?session={}", session))
            .insert_header((USER_ID_HEADER, VIEWER))
            .to_request();
        let layout: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(layout["fields"][0]["label"], "Museographic Index");
        assert_eq!(layout["fields"][1]["label"], "State Of Preservation");
    }
}
