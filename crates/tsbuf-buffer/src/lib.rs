#![warn(clippy::pedantic)]

pub mod chunk_reader;
pub mod config;
pub mod decode_queue;
pub mod error;
pub mod pool;
pub mod stream_buffer;

pub use config::{BufferConfig, DEFAULT_CHUNK_PACKETS};
pub use decode_queue::{DecodeQueue, DecodeTask};
pub use error::BufferError;
pub use pool::DecodePool;
pub use stream_buffer::{BufferStats, StreamBuffer};
