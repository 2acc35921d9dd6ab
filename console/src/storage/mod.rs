//! Console configuration storage

pub mod settings;
