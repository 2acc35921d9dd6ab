//! Plant controller API models
//!
//! Request and response shapes for the bioreactor controller backend. The
//! console never interprets a [`Plan`]; it is carried verbatim from the
//! planning endpoint to the execution endpoint.

pub mod models;

pub use models::*;
