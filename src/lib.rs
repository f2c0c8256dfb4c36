pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod galaxy;
pub mod manifest;
pub mod output;
