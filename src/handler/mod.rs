//! Request handler module
//!
//! Routes each request to the health check, the static artifact server, the
//! index page or the JSON API.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
