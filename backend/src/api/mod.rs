//! HTTP API module.
//!
//! A thin axum shell over [`crate::engine::MailMerge`], plus the SSE log
//! broadcaster every stage reports through.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server, AppState};
pub use types::*;
pub use logs::*;
