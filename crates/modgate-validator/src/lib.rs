//! # modgate-validator
//!
//! Structural gate for gateway module packages. A module must exist, carry
//! the expected extension, be readable, be non-empty and under the size
//! ceiling, and start with a package archive signature before the smoke
//! sub-tests (performance, security, integration) are run against it.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use modgate_validator::ModuleValidator;
//!
//! # async fn example() {
//! let result = ModuleValidator::default()
//!     .validate(Path::new("build/my-module.modl"))
//!     .await;
//! println!("valid: {}", result.success);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod result;
pub mod smoke;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod validator;

pub use config::ValidatorConfig;
pub use error::{ValidatorError, ValidatorResult};
pub use result::{SubTestOutcome, ValidationResult};
pub use validator::{ModuleValidator, PRECHECK_LINES};
