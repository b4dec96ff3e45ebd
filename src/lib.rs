//! Typed, cache-coherent client for a remote product catalog.

pub mod api;
pub mod application;
pub mod cache;
pub mod cli;
pub mod config;
pub mod infra;
