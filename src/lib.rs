pub mod app;
pub mod cipher;
pub mod client;
pub mod component;
pub mod config;
pub mod error;
pub mod exchange;
pub mod grammar;
pub mod manager;
pub mod model;
pub mod session;
pub mod sync;
pub mod system;
pub mod utils;

#[cfg(test)]
mod testing;
