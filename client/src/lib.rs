pub mod app;
pub mod cloud;
pub mod core;
pub mod domain;
pub mod gateway;
pub mod pipeline;
pub mod reader;
pub mod resource;
pub mod utils;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;
