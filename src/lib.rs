//! Smart Garden irrigation controller firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod config_store;
pub mod fsm;
pub mod rpc;
pub mod safety;
pub mod schedule;
pub mod scheduler;
pub mod telemetry;

pub mod error;
pub mod pins;

pub mod adapters;
