//! Aide daemon library - exposes modules for testing.

pub mod bootstrap;
pub mod config;
pub mod dispatcher;
pub mod exec;
pub mod fileops;
pub mod memory;
pub mod monitor;
pub mod music;
pub mod oracle;
pub mod parser;
pub mod paths;
pub mod routes;
pub mod server;
pub mod session;
pub mod speech;
