use crate::domain::ports::Storage;
use crate::utils::error::{Result, SpecError};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 套件內附的資料目錄
pub const BUNDLED_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

/// 覆寫資料目錄用的環境變數
pub const DATA_DIR_ENV: &str = "QTM_SPEC_DATA_DIR";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// 環境變數優先，否則使用內附資料
    pub fn bundled() -> Self {
        match std::env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => {
                tracing::debug!("Using data directory from {}: {}", DATA_DIR_ENV, dir);
                Self::new(dir)
            }
            _ => Self::new(BUNDLED_DATA_DIR),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.base_path.clone(), |acc, part| acc.join(part))
    }
}

impl Storage for LocalStorage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        tracing::debug!("Reading {}", full_path.display());

        // 檔案在離開作用域時關閉
        let mut file = File::open(&full_path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }

    fn list_files(&self) -> Box<dyn Iterator<Item = Result<String>> + '_> {
        if !self.base_path.is_dir() {
            return Box::new(std::iter::once(Err(SpecError::IoError(
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("data directory not found: {}", self.base_path.display()),
                ),
            ))));
        }

        let walker = WalkDir::new(&self.base_path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let relative = entry.path().strip_prefix(&self.base_path).ok()?;
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    Some(Ok(parts.join("/")))
                }
                Ok(_) => None,
                Err(e) => Some(Err(SpecError::from(e))),
            });

        Box::new(walker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_and_list_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("H1-1").join("2024_01_15");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SPAM.json"), b"{}").unwrap();
        std::fs::write(dir.join("A.csv"), b"parameter,value\n").unwrap();

        let storage = LocalStorage::new(temp_dir.path());
        let files: Vec<String> = storage.list_files().map(|f| f.unwrap()).collect();
        assert_eq!(
            files,
            vec!["H1-1/2024_01_15/A.csv", "H1-1/2024_01_15/SPAM.json"]
        );

        assert!(storage.exists("H1-1/2024_01_15/SPAM.json"));
        assert!(!storage.exists("H1-1/2024_01_15/missing.json"));
        assert_eq!(
            storage.read_file("H1-1/2024_01_15/SPAM.json").unwrap(),
            b"{}".to_vec()
        );
    }

    #[test]
    fn test_missing_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("nope"));
        let first = storage.list_files().next().unwrap();
        assert!(first.is_err());
        assert!(storage.read_file("a/b/c.json").is_err());
    }
}
