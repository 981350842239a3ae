pub mod cli;
pub mod commands;
pub mod config;
pub mod metastore;
pub mod mount;
pub mod ui;
