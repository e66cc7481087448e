use std::{
    path::{PathBuf, Path},
    ops::{
        DerefMut,
        Deref
    }
};

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{RwLock, RwLockWriteGuard, RwLockReadGuard};
use crate::log_error;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Serde(serde_json::Error),
}
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io: {}", e),
            Error::Serde(e) => write!(f, "serde: {}", e),
        }
    }
}

/// A JSON document bound to a file.
///
/// Every release of a write guard rewrites the whole file, so the document on
/// disk always matches the last write.
#[derive(Debug)]
pub struct Data<T>(RwLock<T>, PathBuf);

impl<T> Data<T> {
    fn filename(stem: &str) -> PathBuf {
        PathBuf::from(format!("{}.json", stem))
    }
}
impl<T: DeserializeOwned + Default + Serialize> Data<T> {
    /// Load the document, falling back to the default value when the file is
    /// missing. An unreadable document is not kept: it is reported and
    /// replaced by a fresh default one.
    pub fn from_file_or_default(stem: &str) -> Result<Self, Error> {
        let filepath = Self::filename(stem);
        let data = if filepath.exists() {
            let file_content = std::fs::read_to_string(&filepath).map_err(Error::Io)?;
            match serde_json::from_str(&file_content) {
                Ok(data) => data,
                Err(e) => {
                    log_error!("{}: unreadable data file, reinitializing to defaults: {}", filepath.display(), e);
                    let data = T::default();
                    Self::persist(&filepath, &data)?;
                    data
                }
            }
        } else {
            let data = T::default();
            Self::persist(&filepath, &data)?;
            data
        };
        Ok(Self(RwLock::new(data), filepath))
    }
    fn persist(path: &Path, value: &T) -> Result<(), Error> {
        let value = serde_json::to_string(value).map_err(Error::Serde)?;
        std::fs::write(path, value).map_err(Error::Io)
    }
}
impl<T: Serialize> Data<T> {
    pub async fn read(&self) -> DataGuard<'_, T> {
        DataGuard::Read(self.0.read().await)
    }
    pub async fn write(&self) -> DataGuard<'_, T> {
        DataGuard::Write(self.0.write().await, self.1.as_path())
    }
}

pub enum DataGuard<'a, T>
where T: Serialize
{
    Read(RwLockReadGuard<'a, T>),
    Write(RwLockWriteGuard<'a, T>, &'a Path)
}

impl<'a, T: Serialize> Deref for DataGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        match self {
            DataGuard::Read(ref guard) => guard.deref(),
            DataGuard::Write(ref guard, _) => guard.deref()
        }
    }
}
impl<'a, T: Serialize> DerefMut for DataGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            DataGuard::Read(_) => panic!("Read guard cannot be mutated"),
            DataGuard::Write(ref mut guard, _) => guard.deref_mut()
        }
    }
}
impl<'a, T: Serialize> Drop for DataGuard<'a, T>
{
    fn drop(&mut self) {
        if let DataGuard::Write(data, path) = self {
            let value = RwLockWriteGuard::deref(data);
            match serde_json::to_string(value) {
                Ok(value) => {
                    if let Err(e) = std::fs::write(&path, value) {
                        log_error!("{}: unable to persist data: {}", path.display(), e);
                    }
                }
                Err(e) => log_error!("{}: unable to serialize data: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_stem(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("ticketio-data-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("store").to_string_lossy().into_owned()
    }

    #[derive(serde::Serialize, serde::Deserialize, Default, Debug, PartialEq)]
    struct Sample {
        counter: u64,
        entries: HashMap<String, String>,
    }

    #[tokio::test]
    async fn missing_file_creates_defaults() {
        let stem = temp_stem("missing");
        let data: Data<Sample> = Data::from_file_or_default(&stem).unwrap();
        assert_eq!(data.read().await.counter, 0);
        assert!(Data::<Sample>::filename(&stem).exists());
    }

    #[tokio::test]
    async fn write_guard_persists_on_drop() {
        let stem = temp_stem("persist");
        let data: Data<Sample> = Data::from_file_or_default(&stem).unwrap();
        {
            let mut guard = data.write().await;
            guard.counter = 7;
            guard.entries.insert("a".to_string(), "b".to_string());
        }
        let reloaded: Data<Sample> = Data::from_file_or_default(&stem).unwrap();
        let reloaded = reloaded.read().await;
        assert_eq!(reloaded.counter, 7);
        assert_eq!(reloaded.entries.get("a").map(|s| s.as_str()), Some("b"));
    }

    #[tokio::test]
    async fn corrupt_file_reinitializes_to_defaults() {
        let stem = temp_stem("corrupt");
        std::fs::write(Data::<Sample>::filename(&stem), "{not json").unwrap();
        let data: Data<Sample> = Data::from_file_or_default(&stem).unwrap();
        assert_eq!(*data.read().await, Sample::default());
        // The replacement document is persisted right away.
        let content = std::fs::read_to_string(Data::<Sample>::filename(&stem)).unwrap();
        assert!(serde_json::from_str::<Sample>(&content).is_ok());
    }
}
