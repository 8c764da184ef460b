pub mod password;
pub mod validation;

pub use password::{hash_password, validate_password, verify_password, PasswordIssue};
pub use validation::{ValidationError, ValidationResult};
