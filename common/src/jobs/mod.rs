use crate::model::import::ImportReport;
use serde::Serialize;

/// Status of a background job, as returned by the status endpoint.
#[derive(Clone, Debug, Serialize)]
pub enum JobStatus {
    Pending,
    /// Number of data rows processed so far.
    InProgress(u32),
    Completed(ImportReport),
    Failed(JobFailure),
}

/// Why a job stopped before producing a report.
#[derive(Clone, Debug, Serialize)]
pub struct JobFailure {
    pub category: FailureCategory,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Unauthenticated,
    Forbidden,
    MalformedSource,
    PermissionDenied,
    Unavailable,
    Unknown,
}
