//! Utility functions for the application

pub mod net;
pub mod retry;
pub mod time;
