pub mod actions;
pub mod blockchain_manager;
pub mod config;
pub mod controller;
pub mod error;
pub mod network_runner;
pub mod notifications;
pub mod server;
pub mod utils;

#[cfg(test)]
mod test_utils;
