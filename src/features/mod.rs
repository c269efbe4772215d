pub mod auth;
pub mod static_files;
