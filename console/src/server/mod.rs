//! Local operator API

pub mod handlers;
pub mod serve;
