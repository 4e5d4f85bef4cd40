#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod client;
pub mod config;
pub mod data;
pub mod export;
pub mod feed;
pub mod page;
pub mod sanitize;
pub mod schema;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
