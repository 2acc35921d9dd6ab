//! Bioreactor Operator Console Library
//!
//! Core modules for the operator console: the polled status feed, setpoint
//! reconciliation, the draft plan engine and the operator event log.

pub mod app;
pub mod errors;
pub mod events;
pub mod http;
pub mod logs;
pub mod plan;
pub mod server;
pub mod setpoint;
pub mod status;
pub mod storage;
pub mod utils;
pub mod workers;
