use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The DOCQA_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/docqa/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("DOCQA_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("docqa")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_db(&self) -> PathBuf {
        self.root.join("config.redb")
    }

    /// Path of the redb file backing the semantic index `name`.
    ///
    /// The parent `indexes/` directory is created on demand.
    pub fn index_db(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join("indexes");
        std::fs::create_dir_all(&dir)
            .map_err(|_| Error::DataDir(dir.clone()))?;
        Ok(dir.join(format!("{name}.redb")))
    }

    /// List the names of all persisted semantic indexes.
    pub fn list_indexes(&self) -> Result<Vec<String>> {
        let dir = self.root.join("indexes");
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("redb") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
