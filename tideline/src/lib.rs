//! Personalized social-feed ranking engine.
//!
//! The engine combines engagement signals, recency, follow-graph
//! relationships, read history, and diversity constraints into a single
//! ordering per viewer. It is persistence-agnostic: callers implement the
//! store traits in [`stores`] and embed a [`FeedService`].

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod stores;

pub use config::FeedConfig;
pub use error::{FeedError, Result};
pub use services::{FeedService, SessionReadStore};
