pub mod config;
pub mod repeat;
pub mod task;

pub use config::*;
pub use repeat::*;
pub use task::*;
