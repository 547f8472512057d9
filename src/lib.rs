//! Client Pulse - Relationship Health Scoring and Signal Digests
//!
//! A Rust library that watches client communications, scores each client's
//! relationship health, classifies it, and gathers open signals into a
//! daily digest.
//!
//! # Features
//!
//! - Message ingestion with deduplication and local sentiment scoring
//! - Response-time estimation from conversation turns
//! - Additive health scoring and a rule-table status classifier
//! - Pluggable signal oracle (offline lexicon or Anthropic API)
//! - Concurrent batch analysis that isolates per-client failures
//! - Digest rendering as Markdown, JSON, or CSV

/// Status decision table
pub mod classifier;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Signal digest aggregation and rendering
pub mod digest;
/// Error types
pub mod error;
/// Health factor extraction
pub mod factors;
/// Message ingestion
pub mod ingest;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Signal oracles
pub mod oracle;
/// Per-client and batch analysis
pub mod pipeline;
/// Response-time estimation
pub mod response_time;
/// Database schema definitions
pub mod schema;
/// Health scoring
pub mod scoring;
/// Lexicon sentiment analysis
pub mod sentiment;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use digest::{build_digest, Digest};
pub use error::{PulseError, Result};
pub use models::{Client, ClientStatus, Message, Severity, Signal, SignalType};
pub use oracle::{Oracle, OracleResult};
pub use pipeline::{AnalysisService, AnalysisSettings, BatchReport, ClientOutcome};
pub use scoring::{calculate_health_score, score_and_classify};
