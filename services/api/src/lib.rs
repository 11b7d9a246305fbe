//! services/api/src/lib.rs
//!
//! The diary API service: Postgres and OpenAI adapters behind the core ports,
//! plus the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod seed;
pub mod web;
