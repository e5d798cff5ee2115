mod catalog;
mod config;
mod job_controller;
mod services;
mod store;

use crate::catalog::session::ImportSessions;
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::job_controller::state::JobsState;
use crate::store::blob::FsBlobStore;
use crate::store::sqlite::SqliteStore;
use crate::store::UserDirectory;
use actix_web::{web, App, HttpServer};
use common::model::user::Role;
use env_logger::Env;
use log::info;
use std::io;
use std::sync::Arc;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let store = Arc::new(
        SqliteStore::open(&config.database_path)
            .map_err(|e| startup_error("Cannot open the catalog database", e))?,
    );
    let blobs = Arc::new(
        FsBlobStore::new(&config.blob_dir)
            .map_err(|e| startup_error("Cannot open the image directory", e))?,
    );

    if let Some(id) = &config.bootstrap_superadmin {
        store
            .ensure_user(id, "", id)
            .and_then(|_| store.set_role(id, Role::Superadmin))
            .map_err(|e| startup_error("Cannot bootstrap the superadmin", e))?;
        info!("{} is superadmin", id);
    }

    let catalog = Catalog::new(store.clone(), store.clone(), blobs);
    let view = catalog
        .live_view()
        .map_err(|e| startup_error("Cannot load the catalog", e))?;
    match catalog.configuration() {
        Ok(Some(fields)) => info!(
            "Field configuration v{}: {} fields",
            fields.version,
            fields.field_order.len()
        ),
        Ok(None) => info!("No field configuration yet"),
        Err(e) => return Err(startup_error("Cannot read the field configuration", e)),
    }
    let sessions = ImportSessions::with_ttl(config.session_ttl);

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new();

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let url = format!("http://{}:{}", config.host, config.port);
    info!("Server running at {}", url);

    let bind = (config.host.clone(), config.port);
    let json_limit = config.json_limit;
    let server_view = view.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(json_limit))
            .app_data(web::Data::new(catalog.clone()))
            .app_data(web::Data::from(server_view.clone()))
            .app_data(web::Data::new(sessions.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(config.clone()))
            .service(services::objects::configure_routes())
            .service(services::images::configure_routes())
            .service(services::users::configure_routes())
    })
    .bind(bind)?
    .run()
    .await?;

    view.detach();
    info!("Server stopped");
    Ok(())
}
