pub mod cli;
pub mod commands;
pub mod config;
pub mod device;
pub mod listener;
pub mod logging;
pub mod midi;
pub mod mode;
pub mod protocol;
pub mod server;
pub mod shell;
