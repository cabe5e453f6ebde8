//! # grader
//!
//! HTTP API, CLI and configuration around `grader-core`.
//!
//! The library half of the binary, so integration tests can drive the router
//! in-process (`grader::api::create_router`).

pub mod api;
pub mod cli;
pub mod config;
