//! HTTP API handlers for evfb-fs

pub mod forms;
pub mod health;
pub mod submissions;

pub use forms::form_routes;
pub use health::health_routes;
pub use submissions::submission_routes;
