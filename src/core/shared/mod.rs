//! Building blocks every feature module uses: schema and row types, slug
//! enums, the error type, the connection pool and application state.

pub mod enums;
pub mod error;
pub mod models;
pub mod schema;
pub mod state;
pub mod utils;

pub use enums::{Category, Difficulty, Role};
pub use error::{AppError, AppResult};
