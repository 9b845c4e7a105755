//! HTTP front-end for the network connection classifier
//!
//! Serves an HTML form and a JSON endpoint over a pipeline loaded once at
//! startup, plus health and Prometheus endpoints.

pub mod api;
pub mod config;
pub mod page;
