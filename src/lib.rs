pub mod api;
pub mod catalog;
pub mod cli;
pub mod core;
