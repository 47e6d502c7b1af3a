//! Extract instrument samples from Amiga tracker modules.
//!
//! [`format::protracker::ProtrackerMod::open`] classifies and decodes a module
//! and positions the reader at its sample data; [`extract::extract_samples`]
//! then streams each instrument into an [`extract::Encoder`].

pub mod error;
pub mod extract;
pub mod format;

pub use error::{EncodeError, ModError, ReadFailure};
