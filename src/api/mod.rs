//! Thin client for the remote `/api/v1` HTTP API.

mod client;
pub mod endpoints;

pub use client::ApiClient;
