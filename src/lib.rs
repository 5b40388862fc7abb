pub mod client;
pub mod config;
pub mod player;
pub mod works;
