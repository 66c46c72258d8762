//! Persistence of run aggregates.
//!
//! Arrays are stored as one-dimensional float64 `.npy` files so they load
//! directly with `numpy.load`.

mod npy;
mod sink;

pub use npy::{decode, encode, read_npy, write_npy, NpyError};
pub use sink::{npy_file_name, MemorySink, NpySink, PersistenceSink};
