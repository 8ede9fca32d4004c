pub mod config;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod projection;
pub mod scale;
pub mod time;
pub mod traffic;
