//! Dronshop API library.
//!
//! The HTTP application is built by [`routes::app`]; the binary only adds
//! Sentry layers, logging and the listener, so tests can drive the same
//! router with `tower::ServiceExt::oneshot`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
