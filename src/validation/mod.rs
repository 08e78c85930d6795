//! Validation
//!
//! Merging linter and external validator results into diagnostics.

pub mod engine;
pub mod external;

pub use engine::{Aggregator, ValidationMode, DEFAULT_VALIDATE_TIMEOUT};
pub use external::{CylcValidator, ExternalValidator, ValidatorOutcome};
