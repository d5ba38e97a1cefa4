use crate::db::models::{GenerationResult, PlatformConnection};
use crate::db::Database;
use serde::Serialize;

/// Settings key holding the result feed, newest first.
pub const RESULTS_KEY: &str = "social_posts";
/// Settings key holding the platform catalog.
pub const PLATFORMS_KEY: &str = "connected_platforms";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("persisted {key} is corrupt: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("no result with id {0}")]
    ResultNotFound(String),
    #[error("no platform with id {0}")]
    PlatformNotFound(String),
}

impl Serialize for StoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

fn load_blob<T: serde::de::DeserializeOwned>(
    db: &Database,
    key: &'static str,
) -> Result<Option<T>, LoadError> {
    match db.get_setting(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| LoadError::Corrupt { key, source }),
        None => Ok(None),
    }
}

/// Persisted result feed; a missing blob is an empty feed.
pub fn load_results(db: &Database) -> Result<Vec<GenerationResult>, LoadError> {
    Ok(load_blob(db, RESULTS_KEY)?.unwrap_or_default())
}

/// Persisted platform catalog, reconciled against the built-in catalog so stale ids
/// are dropped and new platforms appear disconnected.
pub fn load_platforms(db: &Database) -> Result<Vec<PlatformConnection>, LoadError> {
    let saved: Vec<PlatformConnection> = load_blob(db, PLATFORMS_KEY)?.unwrap_or_default();
    Ok(PlatformConnection::default_catalog()
        .into_iter()
        .map(|default| {
            let connected = saved
                .iter()
                .find(|p| p.id == default.id)
                .is_some_and(|p| p.connected);
            PlatformConnection { connected, ..default }
        })
        .collect())
}

/// Ordered result feed plus platform toggles, written through to the database after
/// every mutation.
pub struct ResultStore {
    db: Database,
    results: Vec<GenerationResult>,
    platforms: Vec<PlatformConnection>,
}

impl ResultStore {
    /// Load both collections. Each one independently falls back to its default when the
    /// persisted copy cannot be read, so a bad blob never blocks startup.
    pub fn open(db: Database) -> Self {
        let results = load_results(&db).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load results, starting with an empty feed");
            Vec::new()
        });
        let platforms = load_platforms(&db).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load platforms, using default catalog");
            PlatformConnection::default_catalog()
        });
        tracing::debug!(results = results.len(), "result store opened");
        Self {
            db,
            results,
            platforms,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn list(&self) -> &[GenerationResult] {
        &self.results
    }

    pub fn get(&self, id: &str) -> Option<&GenerationResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Prepend. The in-memory feed is updated even if the write fails.
    pub fn append(&mut self, result: GenerationResult) -> Result<(), StoreError> {
        self.results.insert(0, result);
        self.save_results()
    }

    pub fn remove(&mut self, id: &str) -> Result<GenerationResult, StoreError> {
        let index = self
            .results
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::ResultNotFound(id.to_string()))?;
        let removed = self.results.remove(index);
        self.save_results()?;
        Ok(removed)
    }

    pub fn list_platforms(&self) -> &[PlatformConnection] {
        &self.platforms
    }

    pub fn platform(&self, id: &str) -> Option<&PlatformConnection> {
        self.platforms.iter().find(|p| p.id == id)
    }

    pub fn toggle_platform(&mut self, id: &str) -> Result<&PlatformConnection, StoreError> {
        let index = self
            .platforms
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::PlatformNotFound(id.to_string()))?;
        self.platforms[index].connected = !self.platforms[index].connected;
        self.save_platforms()?;
        Ok(&self.platforms[index])
    }

    fn save_results(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.results)?;
        self.db.set_setting(RESULTS_KEY, &raw)?;
        Ok(())
    }

    fn save_platforms(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.platforms)?;
        self.db.set_setting(PLATFORMS_KEY, &raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{DesignStyle, GroundingSource, TargetSize, TemplateSuggestion};

    fn result(id: &str, millis: i64) -> GenerationResult {
        GenerationResult {
            id: id.into(),
            topic: format!("topic {id}"),
            freeform_instructions: Some("keep it short".into()),
            caption: "caption".into(),
            hashtags: vec!["#a".into(), "#b".into()],
            image_uri: "data:image/png;base64,AAAA".into(),
            target_size: TargetSize::LandscapeA4,
            target_styles: vec![DesignStyle::Retro, DesignStyle::Vibrant],
            grounding_sources: vec![GroundingSource {
                title: "T".into(),
                uri: "https://t.example".into(),
            }],
            template_suggestions: vec![TemplateSuggestion {
                name: "N".into(),
                description: "D".into(),
                search_uri: "https://www.canva.com/templates/?query=N".into(),
            }],
            created_at_epoch_millis: millis,
        }
    }

    #[test]
    fn test_append_prepends_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let expected = {
            let mut store = ResultStore::open(Database::new(dir.path()).unwrap());
            store.append(result("a", 1)).unwrap();
            store.append(result("b", 2)).unwrap();
            store.append(result("c", 3)).unwrap();
            store.list().to_vec()
        };
        assert_eq!(
            expected.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["c", "b", "a"]
        );

        let reopened = ResultStore::open(Database::new(dir.path()).unwrap());
        assert_eq!(reopened.list(), expected.as_slice());
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut store = ResultStore::open(Database::open_in_memory().unwrap());
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            store.append(result(id, i as i64)).unwrap();
        }
        let removed = store.remove("b").unwrap();
        assert_eq!(removed.id, "b");
        let ids: Vec<_> = store.list().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["d", "c", "a"]);
        assert!(matches!(store.remove("b"), Err(StoreError::ResultNotFound(_))));
    }

    #[test]
    fn test_corrupt_blobs_fall_back_independently() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting(RESULTS_KEY, "{not json").unwrap();
        db.set_setting(
            PLATFORMS_KEY,
            r#"[{"id":"linkedin","displayName":"LinkedIn","iconGlyph":"x","colorToken":"y","connected":true}]"#,
        )
        .unwrap();

        assert!(matches!(
            load_results(&db),
            Err(LoadError::Corrupt { key: RESULTS_KEY, .. })
        ));

        let store = ResultStore::open(db);
        assert!(store.list().is_empty());
        assert_eq!(store.list_platforms().len(), 4);
        assert!(store.platform("linkedin").unwrap().connected);
        assert!(!store.platform("insta").unwrap().connected);
    }

    #[test]
    fn test_unknown_target_size_is_reported_as_corrupt() {
        let db = Database::open_in_memory().unwrap();
        let mut raw = serde_json::to_value(vec![result("a", 1)]).unwrap();
        raw[0]["targetSize"] = serde_json::json!("16:9");
        db.set_setting(RESULTS_KEY, &raw.to_string()).unwrap();
        assert!(matches!(load_results(&db), Err(LoadError::Corrupt { .. })));
    }

    #[test]
    fn test_toggle_platform_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = ResultStore::open(Database::new(dir.path()).unwrap());
            assert!(store.toggle_platform("whatsapp").unwrap().connected);
            assert!(matches!(
                store.toggle_platform("myspace"),
                Err(StoreError::PlatformNotFound(_))
            ));
        }
        let store = ResultStore::open(Database::new(dir.path()).unwrap());
        assert!(store.platform("whatsapp").unwrap().connected);
    }
}
