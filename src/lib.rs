// src/lib.rs

//! Permit Watcher Library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_helpers;
