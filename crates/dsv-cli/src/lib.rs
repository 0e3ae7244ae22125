//! Command-line front end for data set version mappings.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
