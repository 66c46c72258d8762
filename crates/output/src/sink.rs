//! Where final aggregates go.

use crate::npy::{write_npy, NpyError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes named float64 arrays.
///
/// Called once per output at the end of a run, by the coordinator only.
pub trait PersistenceSink {
    /// Store `values` under `name` and return where it ended up.
    fn write_array(&mut self, name: &str, values: &[f64]) -> Result<PathBuf, NpyError>;
}

impl<S: PersistenceSink + ?Sized> PersistenceSink for &mut S {
    fn write_array(&mut self, name: &str, values: &[f64]) -> Result<PathBuf, NpyError> {
        (**self).write_array(name, values)
    }
}

/// `name` with a `.npy` extension, unless it already has one.
pub fn npy_file_name(name: &str) -> String {
    if name.ends_with(".npy") {
        name.to_string()
    } else {
        format!("{}.npy", name)
    }
}

/// Writes `.npy` files into a directory.
#[derive(Debug, Clone)]
pub struct NpySink {
    output_dir: PathBuf,
}

impl NpySink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl PersistenceSink for NpySink {
    fn write_array(&mut self, name: &str, values: &[f64]) -> Result<PathBuf, NpyError> {
        if !self.output_dir.exists() {
            debug!(dir = %self.output_dir.display(), "Creating output directory");
            fs::create_dir_all(&self.output_dir)?;
        }

        let path = self.output_dir.join(npy_file_name(name));
        write_npy(&path, values)?;
        info!(path = %path.display(), len = values.len(), "Array written");
        Ok(path)
    }
}

/// Keeps arrays in memory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    arrays: BTreeMap<String, Vec<f64>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Array stored under `name` (with or without the `.npy` extension).
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.arrays.get(&npy_file_name(name)).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

impl PersistenceSink for MemorySink {
    fn write_array(&mut self, name: &str, values: &[f64]) -> Result<PathBuf, NpyError> {
        let file_name = npy_file_name(name);
        self.arrays.insert(file_name.clone(), values.to_vec());
        Ok(PathBuf::from(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npy::read_npy;

    #[test]
    fn test_extension_appended_once() {
        assert_eq!(npy_file_name("signal"), "signal.npy");
        assert_eq!(npy_file_name("signal.npy"), "signal.npy");
        assert_eq!(npy_file_name("run.1"), "run.1.npy");
    }

    #[test]
    fn test_npy_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Outputs").join("nested");
        let mut sink = NpySink::new(&output);

        let path = sink.write_array("hist", &[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(path, output.join("hist.npy"));
        assert_eq!(read_npy(&path).unwrap(), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.write_array("signal", &[1.0]).unwrap();
        sink.write_array("signal.npy", &[2.0]).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get("signal"), Some(&[2.0][..]));
        assert_eq!(sink.names().collect::<Vec<_>>(), vec!["signal.npy"]);
    }
}
