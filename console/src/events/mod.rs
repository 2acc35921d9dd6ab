//! Operator-visible event log and its terminal rendering

pub mod echo;
pub mod log;
