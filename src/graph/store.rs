use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// Directory of `{city}.osm` graph files
#[derive(Debug, Clone)]
pub struct GraphStore {
    dir: PathBuf,
}

impl GraphStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Graph file for a city; path separators and leading dots in the name
    /// are replaced so the file always lands directly inside the directory
    pub fn path_for(&self, city_name: &str) -> PathBuf {
        self.dir.join(format!("{}.osm", file_stem(city_name)))
    }

    pub fn exists(&self, city_name: &str) -> bool {
        self.path_for(city_name).is_file()
    }

    pub fn save(&self, city_name: &str, contents: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).context("Failed to create graph directory")?;

        let path = self.path_for(city_name);
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Saved {} ({} bytes)", path.display(), contents.len());
        Ok(path)
    }

    /// Delete the city's file; `Ok(false)` when it does not exist
    pub fn delete(&self, city_name: &str) -> Result<bool> {
        let path = self.path_for(city_name);
        if !path.is_file() {
            info!("File doesn't exist: {}", path.display());
            return Ok(false);
        }

        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        info!("Deleted: {}", path.display());
        Ok(true)
    }
}

fn file_stem(city_name: &str) -> String {
    let stem: String = city_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    let trimmed = stem.trim_start_matches('.');
    if trimmed.len() == stem.len() {
        stem
    } else {
        format!("{}{}", "_".repeat(stem.len() - trimmed.len()), trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("graphs"));

        let path = store.save("Сочи", b"<osm/>").unwrap();
        assert_eq!(path, dir.path().join("graphs").join("Сочи.osm"));
        assert!(store.exists("Сочи"));
        assert_eq!(fs::read(path).unwrap(), b"<osm/>");
    }

    #[test]
    fn test_names_stay_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path());

        assert_eq!(store.path_for("../etc/passwd"), dir.path().join("__etc_passwd.osm"));
        assert_eq!(store.path_for("a/b\\c"), dir.path().join("a_b_c.osm"));
        assert_eq!(store.path_for(".."), dir.path().join("__.osm"));
        assert_eq!(store.path_for("Ростов-на-Дону"), dir.path().join("Ростов-на-Дону.osm"));

        let path = store.save("../escape", b"<osm/>").unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[test]
    fn test_delete_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        assert!(!store.delete("Сочи").unwrap());
    }
}
