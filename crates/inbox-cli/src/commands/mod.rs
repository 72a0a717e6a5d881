//! Command handlers

pub mod assistant;
pub mod inbox;
