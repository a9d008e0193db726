pub mod authorization;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod filter;
pub mod logging;
pub mod services;

pub use error::{Error, Result};
