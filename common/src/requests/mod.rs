use crate::model::record::FieldMap;
use crate::model::user::Role;
use serde::Deserialize;

/// Starts an import of the file held by an open import session.
#[derive(Deserialize)]
pub struct ImportRequest {
    pub session_id: String,
    #[serde(default)]
    pub filterable_fields: Vec<String>,
    #[serde(default)]
    pub searchable_fields: Vec<String>,
}

/// Body of the create and update object endpoints.
#[derive(Deserialize)]
pub struct ObjectPayload {
    pub fields: FieldMap,
}

#[derive(Deserialize)]
pub struct RoleChangeRequest {
    pub role: Role,
}
