pub mod config;
pub mod error;
pub mod logger;
pub mod poll;
pub mod shutdown;
pub mod time;
pub mod watcher;
pub mod youtube;
