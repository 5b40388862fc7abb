pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod records;
pub mod spotify;
pub mod state;
pub mod statics;
pub mod storage;
