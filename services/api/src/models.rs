//! API models for request and response payloads

pub mod filters;
pub mod project;
