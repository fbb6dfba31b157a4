use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// AppID 對照表
///
/// 將 Steam AppID 對應到遊戲顯示名稱，查不到時合成 `App_<id>` 當作資料夾名稱
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppIdTable {
    entries: HashMap<String, String>,
}

impl AppIdTable {
    #[must_use]
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// 取得顯示名稱，未登錄的 AppID 回傳合成名稱
    #[must_use]
    pub fn display_name(&self, app_id: &str) -> String {
        self.entries
            .get(app_id)
            .cloned()
            .unwrap_or_else(|| format!("App_{app_id}"))
    }

    #[must_use]
    pub fn contains(&self, app_id: &str) -> bool {
        self.entries.contains_key(app_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 使用者設定，存放於執行目錄的 settings.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    /// 錄製來源資料夾（擷取工具輸出的剪輯根目錄）
    pub source_dir: String,
    /// 匯出根目錄，底下依遊戲名稱分資料夾
    pub export_dir: String,
    /// AppID 對照表檔案路徑，不存在時使用內建表
    pub app_table_path: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            language: Language::EnUs,
            source_dir: String::new(),
            export_dir: String::new(),
            app_table_path: "appid_map.json".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: UserSettings,
    pub app_table: AppIdTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_known_id() {
        let mut entries = HashMap::new();
        entries.insert("730".to_string(), "Counter-Strike 2".to_string());
        let table = AppIdTable::new(entries);

        assert_eq!(table.display_name("730"), "Counter-Strike 2");
    }

    #[test]
    fn test_display_name_unknown_id_is_synthesized() {
        let table = AppIdTable::default();
        assert_eq!(table.display_name("999999"), "App_999999");
    }

    #[test]
    fn test_user_settings_default_fields() {
        let settings = UserSettings::default();
        assert!(settings.source_dir.is_empty());
        assert!(settings.export_dir.is_empty());
        assert_eq!(settings.app_table_path, "appid_map.json");
    }

    #[test]
    fn test_settings_tolerate_missing_fields() {
        // 舊版 settings.json 缺少欄位時應以預設值補齊
        let settings: UserSettings = serde_json::from_str(r#"{"language": "zh-TW"}"#).unwrap();
        assert_eq!(settings.language, Language::ZhTw);
        assert_eq!(settings.app_table_path, "appid_map.json");
    }
}
