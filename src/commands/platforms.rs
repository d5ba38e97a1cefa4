use super::CommandError;
use crate::db::models::PlatformConnection;
use crate::share::{self, ShareError, SharePlan};
use crate::store::ResultStore;
use std::path::Path;

pub fn list_platforms(store: &ResultStore) -> Vec<PlatformConnection> {
    store.list_platforms().to_vec()
}

pub fn toggle_platform(store: &mut ResultStore, id: &str) -> Result<PlatformConnection, CommandError> {
    let platform = store.toggle_platform(id)?.clone();
    tracing::info!(platform = %platform.id, connected = platform.connected, "platform toggled");
    Ok(platform)
}

pub fn share_result(
    store: &ResultStore,
    result_id: &str,
    platform_id: &str,
) -> Result<SharePlan, CommandError> {
    let result = store
        .get(result_id)
        .ok_or_else(|| CommandError::ResultNotFound(result_id.to_string()))?;
    let platform = store
        .platform(platform_id)
        .ok_or_else(|| ShareError::UnknownPlatform(platform_id.to_string()))?;
    Ok(share::plan(result, platform)?)
}

pub async fn export_result(
    store: &ResultStore,
    result_id: &str,
    path: &Path,
) -> Result<usize, CommandError> {
    let result = store
        .get(result_id)
        .ok_or_else(|| CommandError::ResultNotFound(result_id.to_string()))?;
    Ok(share::export_image(result, path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{DesignStyle, GenerationResult, TargetSize};
    use crate::db::Database;

    fn store_with_result() -> ResultStore {
        let mut store = ResultStore::open(Database::open_in_memory().unwrap());
        store
            .append(GenerationResult {
                id: "r1".into(),
                topic: "Coffee".into(),
                freeform_instructions: None,
                caption: "Hello".into(),
                hashtags: vec!["#hi".into()],
                image_uri: "data:image/png;base64,iVBORw0KGgo=".into(),
                target_size: TargetSize::Square,
                target_styles: vec![DesignStyle::Minimalist],
                grounding_sources: vec![],
                template_suggestions: vec![],
                created_at_epoch_millis: 1,
            })
            .unwrap();
        store
    }

    #[test]
    fn test_share_requires_connection() {
        let mut store = store_with_result();
        assert!(matches!(
            share_result(&store, "r1", "whatsapp"),
            Err(CommandError::Share(ShareError::NotConnected(_)))
        ));
        assert!(toggle_platform(&mut store, "whatsapp").unwrap().connected);
        assert!(matches!(
            share_result(&store, "r1", "whatsapp").unwrap(),
            SharePlan::ComposeUrl { .. }
        ));
    }

    #[test]
    fn test_share_unknown_ids() {
        let store = store_with_result();
        assert!(matches!(
            share_result(&store, "nope", "insta"),
            Err(CommandError::ResultNotFound(_))
        ));
        assert!(matches!(
            share_result(&store, "r1", "myspace"),
            Err(CommandError::Share(ShareError::UnknownPlatform(_)))
        ));
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let store = store_with_result();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.png");
        assert_eq!(export_result(&store, "r1", &path).await.unwrap(), 8);
        assert!(path.exists());
    }

    #[test]
    fn test_list_has_default_catalog() {
        let ids: Vec<_> = list_platforms(&store_with_result())
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["insta", "whatsapp", "linkedin", "facebook"]);
    }
}
