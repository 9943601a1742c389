pub mod bootstrap;
pub mod config;
pub mod database;
pub mod logging;
