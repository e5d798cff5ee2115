//! User administration, reserved to superadmins.
//!
//! - `GET /api/users`: every known user with its role.
//! - `PUT /api/users/{user_id}/role`: `RoleChangeRequest` body. Superadmins cannot change their
//!   own role.

mod list;
mod set_role;

use actix_web::web::{get, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/users";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("/{user_id}/role", put().to(set_role::process))
}
