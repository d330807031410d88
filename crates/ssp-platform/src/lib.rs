//! Environment capabilities for the secure session protocol.
//!
//! Defines:
//! - The lower (transport) and upper (application) layer interfaces
//! - The executor clock and [`Timestamp`]
//! - Deterministic mocks of all of the above, plus a mock crypto backend

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mock;
pub mod traits;

pub use traits::{Executor, LowerLayer, Timestamp, UpperLayer};
