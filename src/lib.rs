//! jobtrack - A job application tracker client
//!
//! This library provides the client side of the job tracker: credential
//! storage, the backend API client, the session lifecycle and the job
//! listing cache, plus the command-line front end built on them.

pub mod app;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
