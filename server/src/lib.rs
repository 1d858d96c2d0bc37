//! NetChat operator hub library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod chat;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod routes;
pub mod session;
pub mod state;
pub mod tcp;
pub mod ws;
