#![allow(clippy::missing_errors_doc)]

pub mod abi;
pub mod error;
pub mod mir;
pub mod regalloc;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use error::{Error, Result};
pub use mir::{FunctionBuilder, MachineUnit};
pub use regalloc::allocate;
