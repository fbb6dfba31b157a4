use crate::config::types::{AppIdTable, Config, UserSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 編譯時嵌入的預設 AppID 對照表（不需要外部檔案）
const APPID_MAP_JSON: &str = include_str!("../data/appid_map.json");

impl Config {
    pub fn new() -> Result<Self> {
        let settings = Self::load_settings().unwrap_or_default();
        let app_table = Self::load_app_table(Path::new(&settings.app_table_path))?;

        Ok(Self {
            settings,
            app_table,
        })
    }

    fn load_settings() -> Result<UserSettings> {
        let path = Path::new("settings.json");
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }

    /// 載入 AppID 對照表
    ///
    /// 指定路徑存在時讀取該檔案，否則使用編譯時嵌入的預設表
    pub fn load_app_table(path: &Path) -> Result<AppIdTable> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("無法讀取 AppID 對照表: {}", path.display()))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("無法解析 AppID 對照表: {}", path.display()));
        }

        serde_json::from_str(APPID_MAP_JSON).context("無法解析內建的 AppID 對照表")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_table_parses() {
        let table = Config::load_app_table(Path::new("/nonexistent/appid_map.json")).unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.display_name("730"), "Counter-Strike 2");
    }

    #[test]
    fn test_table_file_overrides_embedded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("appid_map.json");
        fs::write(&path, r#"{"12345": "My Game"}"#).unwrap();

        let table = Config::load_app_table(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.display_name("12345"), "My Game");
        assert_eq!(table.display_name("730"), "App_730");
    }

    #[test]
    fn test_malformed_table_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("appid_map.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_app_table(&path).is_err());
    }
}
