pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod sync;

pub use error::{Error, Result};
