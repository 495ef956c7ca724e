//! HTTP API test suite.
//!
//! Drives the full route table through `actix_web::test`. The worker binary is
//! `/bin/sh`, so every "uploaded spreadsheet" is a shell script that plays
//! the worker; its rows come from a stub reader.
//!
//! Run with: cargo test --test api

mod test_helpers;

mod test_download;
mod test_health;
mod test_processes;
mod test_upload;
