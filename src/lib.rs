//! # Blueprint Statusline
//!
//! A compact statusline for Claude Code sessions: git branch and changes,
//! working directory, model, context usage, five-hour rate-limit utilization
//! and the active ccusage billing block.
//!
//! ## Overview
//!
//! The binary reads the session snapshot that Claude Code pipes to a
//! `statusLine` command, gathers auxiliary state, and prints one or two
//! colorized lines. Every data source degrades to "absent" on failure; only
//! unusable input or configuration produces the error fallback.
//!
//! ## Features
//!
//! - `git` (default): Enables repository inspection via gix

/// Active billing block from the ccusage CLI
pub mod ccusage;

/// Command-line argument parsing
pub mod cli;

/// Typed configuration with compiled defaults
pub mod config;

/// Context-window estimation from transcripts
pub mod context;

/// SQLite session history and API cache
pub mod db;

/// Segment formatting and line assembly
pub mod display;

/// Git repository inspection (feature-gated)
#[cfg(feature = "git")]
pub mod git;

/// Data models for hook input and gathered state
pub mod models;

/// Render pipeline
pub mod statusline;

/// Online usage limits retrieved from the Claude OAuth API
pub mod usage_api;

/// Value formatters, paths, and subprocess helpers
pub mod utils;
