pub mod csv;
pub mod field_config;
pub mod import;
pub mod record;
pub mod user;
