//! Plant backend access

pub mod client;
pub mod plant;
