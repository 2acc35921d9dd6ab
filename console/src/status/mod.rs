//! Authoritative status feed

pub mod backoff;
pub mod feed;
