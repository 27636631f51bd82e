//! # EDH Pod Bot
//!
//! A Telegram bot for recording Commander (EDH) games played by a pod, with
//! player statistics and leaderboards.
//!
//! ## Features
//! - Record games through a guided, per-user workflow (players, outcomes, eliminations)
//! - Atomic game commits with two-player confirmed deletion
//! - Win rate, kills and games played leaderboards (past week or all-time)
//! - Weekly roundup posted to every active pod
//! - Persistent storage with SQLite

/// Bot command handlers and message processing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Recording workflow, statistics, and background services
pub mod services;
/// Utility functions for datetime, validation, and formatting
pub mod utils;
