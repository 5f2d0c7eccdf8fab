//! HTTP API: routing, cookie transport and request/response mapping.

pub mod app;
pub mod context;
pub mod cookies;
