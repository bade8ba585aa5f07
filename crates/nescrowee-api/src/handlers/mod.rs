//! Request handlers

pub mod disputes;
pub mod health;
pub mod status;
