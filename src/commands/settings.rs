use super::CommandError;
use crate::db::Database;
use std::collections::BTreeMap;

pub const SETTING_KEYS: &[&str] = &["gemini_api_key", "gemini_base_url", "text_model", "image_model"];

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn check_key(key: &str) -> Result<(), CommandError> {
    if SETTING_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(CommandError::UnknownSetting(key.to_string()))
    }
}

/// Stored settings; API keys come back masked.
pub fn get_settings(db: &Database) -> Result<BTreeMap<String, String>, CommandError> {
    let mut map = BTreeMap::new();
    for key in SETTING_KEYS {
        if let Some(value) = db.get_setting(key)? {
            let shown = if key.ends_with("_api_key") {
                mask(&value)
            } else {
                value
            };
            map.insert(key.to_string(), shown);
        }
    }
    Ok(map)
}

pub fn set_setting(db: &Database, key: &str, value: &str) -> Result<(), CommandError> {
    check_key(key)?;
    db.set_setting(key, value.trim())?;
    tracing::info!(key, "setting updated");
    Ok(())
}

pub fn delete_setting(db: &Database, key: &str) -> Result<(), CommandError> {
    check_key(key)?;
    db.delete_setting(key)?;
    tracing::info!(key, "setting removed");
    Ok(())
}
