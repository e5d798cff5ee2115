//! # CSV Import Job Service
//!
//! `POST /api/objects/csv/import` imports the file held by an import session.
//!
//! 1. The acting user is checked first: only a superadmin may import. Unauthorized requests are
//!    answered immediately and no job is created.
//! 2. `schedule_import_job` registers a `Pending` job, returns its id to the client and spawns a
//!    task that runs `Catalog::import` on the blocking thread pool.
//! 3. The worker reports `InProgress(rows)` after every row through the job channel.
//! 4. When the worker returns, the job is marked `Completed` with the `ImportReport`, or `Failed`
//!    with the failure category and message. A run that imported at least one record closes
//!    the session.

use crate::catalog::delimited::SourceTable;
use crate::catalog::import::{authorize_import, ImportJob};
use crate::catalog::session::ImportSessions;
use crate::catalog::Catalog;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::services::{acting_user, import_error_response, store_error_response};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::jobs::{FailureCategory, JobFailure, JobStatus};
use common::model::user::ActingUser;
use common::requests::ImportRequest;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::mpsc;

pub(crate) async fn process(
    req: HttpRequest,
    catalog: web::Data<Catalog>,
    sessions: web::Data<ImportSessions>,
    jobs_state: web::Data<JobsState>,
    body: web::Json<ImportRequest>,
) -> impl Responder {
    let user = match acting_user(&req, &catalog) {
        Ok(user) => user,
        Err(e) => return store_error_response(&e),
    };
    if let Err(e) = authorize_import(&user) {
        return import_error_response(&e);
    }

    let request = body.into_inner();
    let Some(table) = sessions.get(&request.session_id).await else {
        return HttpResponse::NotFound().body("Import session not found");
    };

    let job_id = schedule_import_job(
        jobs_state.get_ref().clone(),
        catalog.get_ref().clone(),
        sessions.get_ref().clone(),
        table,
        request,
        user,
    )
    .await;
    HttpResponse::Ok().body(job_id)
}

fn import_blocking(
    tx: mpsc::Sender<JobUpdate>,
    job_id: String,
    catalog: Catalog,
    table: Arc<SourceTable>,
    request: &ImportRequest,
    user: &ActingUser,
) -> JobStatus {
    let job = ImportJob {
        source_text: &table.source_text,
        headers: &table.headers,
        delimiter: table.delimiter,
        filterable_fields: &request.filterable_fields,
        searchable_fields: &request.searchable_fields,
    };
    let mut report_progress = |row: usize| {
        let _ = tx.blocking_send(JobUpdate {
            job_id: job_id.clone(),
            status: JobStatus::InProgress(row as u32),
        });
    };

    match catalog.import(&job, user, &mut report_progress) {
        Ok(outcome) => JobStatus::Completed(outcome.into_report()),
        Err(e) => JobStatus::Failed(JobFailure {
            category: e.category(),
            message: e.to_string(),
        }),
    }
}

async fn schedule_import_job(
    jobs_state: JobsState,
    catalog: Catalog,
    sessions: ImportSessions,
    table: Arc<SourceTable>,
    request: ImportRequest,
    user: ActingUser,
) -> String {
    let job_id = uuid::Uuid::new_v4().to_string();
    jobs_state.set(&job_id, JobStatus::Pending).await;
    info!(
        "Import job {} scheduled by {} for session {}",
        job_id, user.id, request.session_id
    );

    let value = job_id.clone();
    tokio::spawn(async move {
        let tx_block = jobs_state.tx.clone();
        let value_for_blocking = value.clone();
        let session_id = request.session_id.clone();

        let handle = tokio::task::spawn_blocking(move || {
            import_blocking(
                tx_block,
                value_for_blocking,
                catalog,
                table,
                &request,
                &user,
            )
        });

        let status = match handle.await {
            Ok(status) => status,
            Err(join_err) => {
                error!("Import job {} panicked: {}", value, join_err);
                JobStatus::Failed(JobFailure {
                    category: FailureCategory::Unknown,
                    message: format!("join error: {}", join_err),
                })
            }
        };
        if let JobStatus::Completed(report) = &status {
            if report.outcome.imported > 0 {
                sessions.close(&session_id).await;
            }
        }
        jobs_state.set(&value, status).await;
    });

    job_id
}
