//! HTTP surface: webhook intake and operational endpoints.

pub mod server;

pub use server::{AppState, start_http_server};
