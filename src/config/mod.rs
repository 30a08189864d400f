//! Configuration module
//!
//! Loading and validation of the game configuration: round structure,
//! damage tables, bot timing and prompt banks.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
