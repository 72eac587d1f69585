mod config;
mod optimistic;

pub use config::*;
pub use optimistic::*;
