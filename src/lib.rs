//! Stitchcraft: design, count and export crochet patterns.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod engine;
pub mod models;
