//! UNDERDOG: NBA underdog recommendation engine.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod llm;
pub mod strategy;
pub mod engine;
pub mod storage;
pub mod export;
