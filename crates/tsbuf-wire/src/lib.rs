#![warn(clippy::pedantic)]

pub mod error;
pub mod source;
pub mod sync;

pub use error::FormatError;
pub use source::{ByteSource, Seekable, Sequential};
pub use sync::{Detection, Resync, SyncDetector};
