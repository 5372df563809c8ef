//! Chunked transfer of an artifact into an open release session.
//!
//! The server dictates the chunk size and hands out one URL per chunk. This
//! module turns that into byte ranges ([`ChunkPlan`]) and sends them with
//! bounded parallelism and per-chunk retry ([`ChunkUploader`]).
//!
//! # Example
//!
//! ```
//! use appcenter_core::upload::ChunkPlan;
//!
//! let plan = ChunkPlan::new(10, 4);
//! assert_eq!(plan.chunk_count(), 3);
//! let lengths: Vec<u64> = plan.ranges().map(|r| r.length).collect();
//! assert_eq!(lengths, vec![4, 4, 2]);
//! ```

mod chunk;
mod error;
mod uploader;

pub use chunk::{Chunk, ChunkPlan, ChunkRange};
pub use error::UploadError;
pub use uploader::ChunkUploader;
