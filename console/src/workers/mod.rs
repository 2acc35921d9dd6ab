//! Background workers

pub mod echo;
pub mod poller;
