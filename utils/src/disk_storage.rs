//! Utilities for storing a struct in a file on the disk.
//! The struct should implement Serialize and Deserialize from serde.
//! Supported file formats are TOML and JSON.

use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use serde::{de::DeserializeOwned, Serialize};

pub enum FileFormat {
    TOML,
    JSON,
}

impl FileFormat {
    fn extension(&self) -> &'static str {
        match self {
            FileFormat::TOML => "toml",
            FileFormat::JSON => "json",
        }
    }
}

pub trait DiskStorageInterface
where
    Self: Sized + Debug + Default + Serialize + DeserializeOwned,
{
    const FILE_NAME: &'static str;
    const FORMAT: FileFormat;

    /// Default location of the file, under `~/.tally`
    fn path() -> crate::Result<PathBuf> {
        let dirs = BaseDirs::new().ok_or(crate::Error::BaseDirsFailed)?;
        let path = dirs
            .home_dir()
            .join(".tally")
            .join(Self::FILE_NAME)
            .with_extension(Self::FORMAT.extension());
        Ok(path)
    }

    /// Load the content from the default location, see [`DiskStorageInterface::load_from`]
    fn load() -> crate::Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load the content from the file if it exists otherwise return the default value
    fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| crate::Error::FileReadFailed(path.to_path_buf(), e))?;

            match Self::FORMAT {
                FileFormat::TOML => toml::from_str(&content)
                    .map_err(|e| crate::Error::TomlParsingFailed(path.to_path_buf(), e)),
                FileFormat::JSON => serde_json::from_str(&content)
                    .map_err(|e| crate::Error::JsonParsingFailed(path.to_path_buf(), e)),
            }
        } else {
            Ok(Self::default())
        }
    }

    /// Save content to a file, creating the directories and file as necessary.
    /// An existing file is overwritten wholesale.
    fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| crate::Error::CreateDirAllFailed(parent.to_path_buf(), e))?;
        }

        let content = match Self::FORMAT {
            FileFormat::TOML => toml::to_string_pretty(self)
                .map_err(|e| crate::Error::TomlFormattingFailed(format!("{self:?}"), e))?,
            FileFormat::JSON => serde_json::to_string(self)
                .map_err(|e| crate::Error::JsonFormattingFailed(format!("{self:?}"), e))?,
        };

        fs::write(path, content).map_err(|e| crate::Error::FileWriteFailed(path.to_path_buf(), e))?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;

    use super::*;

    /// Unique path under the OS temp dir, the file itself is not created.
    pub(crate) fn temp_path(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("tally-test-{}-{n}", std::process::id()))
            .join(name)
    }

    #[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
    struct Doc {
        name: String,
        count: u32,
    }

    impl DiskStorageInterface for Doc {
        const FILE_NAME: &'static str = "doc";
        const FORMAT: FileFormat = FileFormat::JSON;
    }

    #[test]
    fn test_load_missing_file_gives_default() {
        let path = temp_path("missing.json");
        assert_eq!(Doc::load_from(&path).unwrap(), Doc::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("nested/doc.json");
        let doc = Doc {
            name: "hello".to_string(),
            count: 3,
        };
        doc.save_to(&path).unwrap();

        assert_eq!(Doc::load_from(&path).unwrap(), doc);
    }

    #[test]
    fn test_load_malformed_file() {
        let path = temp_path("bad.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Doc::load_from(&path),
            Err(crate::Error::JsonParsingFailed(..))
        ));
    }
}
