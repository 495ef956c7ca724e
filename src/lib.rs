//! Account check server library.
//!
//! HTTP control plane for the external batch account-checking worker: the
//! process registry, completion watcher, result discovery, and progress
//! estimation, plus the API that exposes them.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
