//! `GET /api/objects`: one page of the live view, filtered by `q` and `filter.<field>`.

use crate::catalog::view::{ListQuery, LiveView};
use crate::catalog::{require_view, Catalog, CatalogError};
use crate::services::{acting_user, catalog_error_response};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::model::record::{Page, Record};
use std::collections::HashMap;

pub(crate) async fn process(
    req: HttpRequest,
    params: web::Query<HashMap<String, String>>,
    catalog: web::Data<Catalog>,
    view: web::Data<LiveView>,
) -> impl Responder {
    match list_objects(&req, &params, &catalog, &view) {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => catalog_error_response(&e),
    }
}

fn list_objects(
    req: &HttpRequest,
    params: &HashMap<String, String>,
    catalog: &Catalog,
    view: &LiveView,
) -> Result<Page<Record>, CatalogError> {
    let user = acting_user(req, catalog)?;
    require_view(&user)?;
    Ok(view.current().query(&ListQuery::from_params(params)))
}
