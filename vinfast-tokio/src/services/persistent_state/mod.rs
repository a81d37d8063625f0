//! Save persistent state to disk
use std::{
    io::Write,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use vinfast_common::entities::Id;

/// Configuration for `PersistentState`.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Path to the directory where state should be saved.
    pub state_path: PathBuf,
}

/// Errors that can occur when using a `PersistentState`.
#[derive(Error, Debug)]
pub enum Error {
    /// An IO error occurred.
    #[error("IO error file {0}: {1}")]
    IoError(String, std::io::Error),

    /// An error occurred while serializing or deserializing JSON.
    #[error("JSON error file {0}: {1}")]
    JsonError(String, serde_json::Error),

    /// Nothing has been saved under this name yet.
    #[error("No saved state in {0}")]
    NotFound(String),
}

/// This is used to save state.
#[derive(Debug)]
pub struct PersistentStateDatabase {
    path: PathBuf,
}

impl PersistentStateDatabase {
    /// Create a new `PersistentState` instance.
    ///
    /// # Errors
    ///
    /// This function will return an error if the directory does not exist and cannot be created.
    pub fn new(config: &Config) -> Result<PersistentStateDatabase, Error> {
        let path = &config.state_path;
        if !path.is_dir() {
            std::fs::create_dir_all(path)
                .map_err(|e| Error::IoError(path.to_string_lossy().to_string(), e))?;
        }

        Ok(PersistentStateDatabase { path: path.clone() })
    }

    /// Get a `PersistentState` instance for a vehicle and name.
    #[must_use]
    pub fn for_name<T>(&self, id: &Id, name: &str) -> PersistentStateRow<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let id = id.as_str().replace('/', "_");
        let name = name.replace('/', "_");
        let name = format!("{name}.json");
        let path = self.path.join(id).join(name);
        PersistentStateRow::new(path)
    }
}

/// One saved value.
#[derive(Debug)]
pub struct PersistentStateRow<T: Serialize + DeserializeOwned> {
    path: PathBuf,
    phantom: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> PersistentStateRow<T> {
    const fn new(path: PathBuf) -> Self {
        PersistentStateRow {
            path,
            phantom: PhantomData,
        }
    }

    fn display(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    /// Save a value to disk.
    ///
    /// The value is written to a temporary file and renamed into place. The file is only
    /// readable by its owner.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value cannot be serialized to JSON or if the file
    /// cannot be written.
    pub fn save(&self, value: &T) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::IoError(parent.to_string_lossy().to_string(), e))?;
        }

        let tmp_file = self.path.with_extension("tmp");

        let file = create_private(&tmp_file)
            .map_err(|e| Error::IoError(tmp_file.to_string_lossy().to_string(), e))?;

        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)
            .map_err(|e| Error::JsonError(tmp_file.to_string_lossy().to_string(), e))?;

        writer
            .flush()
            .map_err(|e| Error::IoError(tmp_file.to_string_lossy().to_string(), e))?;

        std::fs::rename(&tmp_file, &self.path).map_err(|e| Error::IoError(self.display(), e))?;

        Ok(())
    }

    /// Load a value from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if nothing was saved yet, otherwise an error if the file cannot
    /// be read or the value cannot be deserialized from JSON.
    pub fn load(&self) -> Result<T, Error> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(self.display()))
            }
            Err(e) => return Err(Error::IoError(self.display(), e)),
        };
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| Error::JsonError(self.display(), e))
    }

    /// Remove the saved value, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::IoError(self.display(), e)),
        }
    }
}

/// Create a new file that only the owner can read or write.
fn create_private(path: &Path) -> std::io::Result<std::fs::File> {
    // The mode only applies when the file is created, so start fresh.
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
    struct Example {
        value: u32,
    }

    fn database(dir: &tempfile::TempDir) -> PersistentStateDatabase {
        let config = Config {
            state_path: dir.path().join("state"),
        };
        PersistentStateDatabase::new(&config).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let psd = database(&dir);
        let row = psd.for_name::<Example>(&Id::new("vf8"), "token");

        assert!(matches!(row.load(), Err(Error::NotFound(_))));

        row.save(&Example { value: 42 }).unwrap();
        assert_eq!(row.load().unwrap(), Example { value: 42 });
        assert!(dir.path().join("state/vf8/token.json").is_file());

        row.delete().unwrap();
        assert!(matches!(row.load(), Err(Error::NotFound(_))));
        row.delete().unwrap();
    }

    #[test]
    fn test_rows_are_per_vehicle() {
        let dir = tempfile::tempdir().unwrap();
        let psd = database(&dir);
        let a = psd.for_name::<Example>(&Id::new("a"), "token");
        let b = psd.for_name::<Example>(&Id::new("b/c"), "token");

        a.save(&Example { value: 1 }).unwrap();
        b.save(&Example { value: 2 }).unwrap();
        assert_eq!(a.load().unwrap(), Example { value: 1 });
        assert_eq!(b.load().unwrap(), Example { value: 2 });
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let psd = database(&dir);
        let row = psd.for_name::<Example>(&Id::new("vf8"), "token");
        std::fs::create_dir_all(dir.path().join("state/vf8")).unwrap();
        std::fs::write(dir.path().join("state/vf8/token.json"), "not json").unwrap();
        assert!(matches!(row.load(), Err(Error::JsonError(_, _))));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let psd = database(&dir);
        let row = psd.for_name::<Example>(&Id::new("vf8"), "token");

        // A leftover from an interrupted save must not keep its loose mode.
        let tmp = dir.path().join("state/vf8/token.tmp");
        std::fs::create_dir_all(tmp.parent().unwrap()).unwrap();
        std::fs::write(&tmp, "partial").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        row.save(&Example { value: 7 }).unwrap();
        let mode = std::fs::metadata(dir.path().join("state/vf8/token.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!tmp.exists());

        row.save(&Example { value: 8 }).unwrap();
        assert_eq!(row.load().unwrap(), Example { value: 8 });
    }
}
