//! Repolake core library: repository walk, classification, reference
//! extraction, and graph document export.
//!
//! The main entry point is [`pipeline::RepolakePipeline`], which runs the
//! Walk → Resolve → Export stages and returns a [`types::GraphDocument`].

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod types;
