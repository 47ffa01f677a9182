pub mod canonical;
pub mod config;
pub mod time;
