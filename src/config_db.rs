use std::path::Path;

use redb::{Database, ReadableDatabase, TableDefinition};

use crate::error::{Error, Result};

const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");
const INDEX_DOCS: TableDefinition<&str, &str> =
    TableDefinition::new("index_docs");

/// Settings key for the configured fallback point list (JSON array).
pub const KEY_FALLBACK_POINTS: &str = "fallback_points";

/// Settings key for the generative model name.
pub const KEY_GENERATIVE_MODEL: &str = "generative_model";

/// Settings key for the default retrieval strategy.
pub const KEY_DEFAULT_STRATEGY: &str = "default_strategy";

pub struct ConfigDb {
    db: Database,
}

impl ConfigDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(SETTINGS)?;
        txn.open_table(INDEX_DOCS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Settings --

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Get a setting, returning the default if not set.
    pub fn get_setting_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get_setting(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    pub fn remove_setting(&self, key: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(SETTINGS)?;
            let removed = table.remove(key)?.is_some();
            removed
        };
        txn.commit()?;
        Ok(removed)
    }

    // -- Fallback points --

    /// The configured fallback point list, or `None` when unset.
    pub fn fallback_points(&self) -> Result<Option<Vec<String>>> {
        let Some(raw) = self.get_setting(KEY_FALLBACK_POINTS)? else {
            return Ok(None);
        };
        let points: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("stored fallback points are not valid: {e}"))
        })?;
        Ok(Some(points))
    }

    pub fn set_fallback_points(&self, points: &[String]) -> Result<()> {
        let raw = serde_json::to_string(points)
            .map_err(|e| Error::Config(format!("cannot encode points: {e}")))?;
        self.set_setting(KEY_FALLBACK_POINTS, &raw)
    }

    pub fn clear_fallback_points(&self) -> Result<bool> {
        self.remove_setting(KEY_FALLBACK_POINTS)
    }

    // -- Indexed documents --

    /// Record which source documents went into a named index.
    pub fn set_index_docs(&self, index: &str, docs: &[String]) -> Result<()> {
        let raw = serde_json::to_string(docs)
            .map_err(|e| Error::Config(format!("cannot encode docs: {e}")))?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(INDEX_DOCS)?;
            table.insert(index, raw.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_index_docs(&self, index: &str) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(INDEX_DOCS)?;
        let Some(raw) = table.get(index)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(raw.value()).map_err(|e| {
            Error::Config(format!("stored document list is not valid: {e}"))
        })
    }

    pub fn remove_index_docs(&self, index: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(INDEX_DOCS)?;
            let removed = table.remove(index)?.is_some();
            removed
        };
        txn.commit()?;
        Ok(removed)
    }
}

impl std::fmt::Debug for ConfigDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDb").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, ConfigDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = ConfigDb::open(&tmp.path().join("config.redb")).unwrap();
        (tmp, db)
    }

    #[test]
    fn settings_crud() {
        let (_tmp, db) = test_db();

        assert_eq!(db.get_setting(KEY_GENERATIVE_MODEL).unwrap(), None);
        assert_eq!(
            db.get_setting_or(KEY_GENERATIVE_MODEL, "gemini-2.5-flash")
                .unwrap(),
            "gemini-2.5-flash"
        );

        db.set_setting(KEY_GENERATIVE_MODEL, "custom-model").unwrap();
        assert_eq!(
            db.get_setting(KEY_GENERATIVE_MODEL).unwrap(),
            Some("custom-model".to_string())
        );

        assert!(db.remove_setting(KEY_GENERATIVE_MODEL).unwrap());
        assert!(!db.remove_setting(KEY_GENERATIVE_MODEL).unwrap());
    }

    #[test]
    fn default_strategy_round_trip() {
        let (_tmp, db) = test_db();

        assert_eq!(db.get_setting(KEY_DEFAULT_STRATEGY).unwrap(), None);

        db.set_setting(KEY_DEFAULT_STRATEGY, "heading").unwrap();
        assert_eq!(
            db.get_setting(KEY_DEFAULT_STRATEGY).unwrap(),
            Some("heading".to_string())
        );

        assert!(db.remove_setting(KEY_DEFAULT_STRATEGY).unwrap());
        assert_eq!(db.get_setting(KEY_DEFAULT_STRATEGY).unwrap(), None);
    }

    #[test]
    fn fallback_points_round_trip() {
        let (_tmp, db) = test_db();

        assert_eq!(db.fallback_points().unwrap(), None);

        let points = vec!["First point.".to_string(), "Second.".to_string()];
        db.set_fallback_points(&points).unwrap();
        assert_eq!(db.fallback_points().unwrap(), Some(points));

        assert!(db.clear_fallback_points().unwrap());
        assert_eq!(db.fallback_points().unwrap(), None);
    }

    #[test]
    fn fallback_points_reject_garbage() {
        let (_tmp, db) = test_db();
        db.set_setting(KEY_FALLBACK_POINTS, "not json").unwrap();
        assert!(db.fallback_points().is_err());
    }

    #[test]
    fn index_docs_round_trip() {
        let (_tmp, db) = test_db();

        assert!(db.get_index_docs("default").unwrap().is_empty());

        let docs = vec!["notes.pdf".to_string(), "slides.pptx".to_string()];
        db.set_index_docs("default", &docs).unwrap();
        assert_eq!(db.get_index_docs("default").unwrap(), docs);

        assert!(db.remove_index_docs("default").unwrap());
        assert!(db.get_index_docs("default").unwrap().is_empty());
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.redb");

        {
            let db = ConfigDb::open(&path).unwrap();
            db.set_setting("version", "1").unwrap();
        }

        {
            let db = ConfigDb::open(&path).unwrap();
            assert_eq!(
                db.get_setting("version").unwrap(),
                Some("1".to_string())
            );
        }
    }
}
