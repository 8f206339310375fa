pub mod aliases;
pub mod archive;
pub mod bitset;
pub mod config;
pub mod encoding;
pub mod functions;
pub mod pool;
pub mod serialize;

pub use functions::*;
pub use pool::{POOL, THREAD_POOL};
