//! # EVFB Common Library
//!
//! Shared code for the event feedback crates:
//! - Database bootstrap and models (forms, fields, submissions, responses)
//! - Configuration loading and root folder resolution
//! - Submission key generation
//! - Error type and time helpers

pub mod config;
pub mod db;
pub mod error;
pub mod submission_key;
pub mod time;

pub use error::{Error, Result};
pub use submission_key::SubmissionKey;
