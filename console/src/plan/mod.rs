//! Plan drafting and execution

pub mod engine;
pub mod fsm;
