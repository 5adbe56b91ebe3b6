#![forbid(unsafe_code)]

pub mod chrome;
pub mod cli;
pub mod commands;
pub mod config;
pub mod driver;
pub mod extract;
pub mod formats;
pub mod harvest;
pub mod logging;
pub mod navigator;
pub mod recommend;
pub mod store;
