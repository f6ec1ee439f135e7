//! HTTP proxy that turns prompts into stored artifacts
//!
//! Image prompts go to Cloudflare Workers AI, diagram sources go to a
//! rendering service, and small plot programs are rendered locally. Every
//! result is written under the static directory and returned as
//! `{"created": ..., "data": [{"url": ...}]}`.

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod plot;
pub mod server;
pub mod storage;
pub mod upstream;
