// lib.rs
pub mod colour;
pub mod commands;
pub mod config;
pub mod devices;
pub mod docs;
pub mod error;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod transport;
pub mod utils;
