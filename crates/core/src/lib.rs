//! Wire model and pure helpers for the taskgate gateway.
//!
//! This crate holds everything that travels over the bus — tasks, results,
//! pokes, file descriptors — together with the envelope codec, well-known
//! subject names, and small digest/sniffing utilities. It depends on no
//! other workspace crate.

pub mod codec;
pub mod hashing;
pub mod sniff;
pub mod subject;
pub mod task;

pub use codec::{decode, encode, CodecError};
pub use task::{
    CreateFile, File, FileResponse, RemoteError, RemoteErrorCode, Task, TaskPoke, TaskPokeResponse,
    TaskResult, TaskStatus,
};
