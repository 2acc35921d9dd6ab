//! Setpoint editing and reconciliation

pub mod editor;
pub mod state;
