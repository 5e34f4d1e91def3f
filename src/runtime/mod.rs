// src/runtime/mod.rs

//! Process-level runtime helpers shared by client tasks.

pub mod shutdown;

pub use shutdown::termination_signal;
