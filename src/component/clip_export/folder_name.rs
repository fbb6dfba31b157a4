//! 錄製資料夾名稱解析
//!
//! 擷取工具輸出的資料夾命名為 `clip_<appid>_<日期>_<時間>`，
//! 從中取出 AppID 與錄製時間，並查表換成遊戲顯示名稱

use crate::config::AppIdTable;
use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// 擷取工具以 UTC 寫入資料夾時間，固定補上時差
const CAPTURE_TIME_OFFSET_HOURS: i64 = 2;

static REGEX_FOLDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^clip_(\d+)_(\d{8})_(\d{6})$").expect("Invalid regex"));

/// 解析後的錄製資訊
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureInfo {
    pub app_id: String,
    pub game_name: String,
    /// 已補時差、可直接用於檔名的時間字串（`YYYY-MM-DD_HH.MM.SS`）
    pub timestamp: String,
}

/// 資料夾名稱解析器
///
/// 對照表在建構時傳入，測試可直接替換而不需讀檔
pub struct FolderNameParser {
    app_table: AppIdTable,
}

impl FolderNameParser {
    #[must_use]
    pub const fn new(app_table: AppIdTable) -> Self {
        Self { app_table }
    }

    /// 解析資料夾名稱
    ///
    /// 名稱不符合命名慣例（含日期時間無法解析）時回傳 `None`，
    /// 表示「不是錄製資料夾」而非錯誤
    #[must_use]
    pub fn parse(&self, folder_name: &str) -> Option<CaptureInfo> {
        let captures = REGEX_FOLDER_NAME.captures(folder_name)?;
        let app_id = captures.get(1)?.as_str();
        let date_str = captures.get(2)?.as_str();
        let time_str = captures.get(3)?.as_str();

        let recorded_at =
            NaiveDateTime::parse_from_str(&format!("{date_str}{time_str}"), "%Y%m%d%H%M%S")
                .ok()?
                + Duration::hours(CAPTURE_TIME_OFFSET_HOURS);

        Some(CaptureInfo {
            app_id: app_id.to_string(),
            game_name: self.app_table.display_name(app_id),
            timestamp: recorded_at.format("%Y-%m-%d_%H.%M.%S").to_string(),
        })
    }
}
