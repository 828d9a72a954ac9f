//! Folio - a content store for editorial articles
//!
//! This library provides the geographic taxonomy, reference data, media
//! assets, articles and publishing workflow behind the folio HTTP API.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
