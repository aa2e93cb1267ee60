//! Streamgate — live/timeshift redirect middleware for an RTP/RTSP-to-HTTP proxy
//!
//! Library interface for the binary and integration tests.
//! The binary entry point is in main.rs.

pub mod config;
pub mod error;
pub mod metrics;
pub mod rewrite;
pub mod server;
