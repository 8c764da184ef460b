//! Application wiring split from main.rs: routing, health checks and shutdown

mod health;
mod server;
mod shutdown;

pub use health::*;
pub use server::*;
pub use shutdown::*;
