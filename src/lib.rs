//! Data room file manager backed by a local SQLite state store.
//!
//! This library provides the folder/file store, its persistence backends and
//! the name and PDF content search engine.

pub mod api;
pub mod config;
pub mod error;
pub mod search;
pub mod store;
