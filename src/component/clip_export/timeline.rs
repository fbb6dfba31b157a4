//! 時間軸事件分類
//!
//! 讀取剪輯附帶的事件時間軸（回合開始、擊殺），推斷整段剪輯
//! 最精彩的一刻，輸出一段可附加在檔名上的標籤。
//! 分類本身是純函式；讀檔與解析失敗由呼叫端決定如何降級。

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// 多殺事件的標題關鍵字
const MULTI_KILL_KEYWORDS: [&str; 5] = [
    "Double kill",
    "Triple kill",
    "Quad kill",
    "Ace",
    "Multi kill",
];

const ROUND_START_PREFIX: &str = "Start of round";
const KILL_TITLE_PREFIX: &str = "You killed ";
const SELF_KILL_TITLE: &str = "You killed yourself";
const HIGHLIGHT_TIER: &str = "Highlight";

static REGEX_TITLE_VICTIMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"You killed (.+?)(?:\s+with|$)").expect("Invalid regex"));

static REGEX_DESC_VICTIMS_WITH_WEAPON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"You killed (.+?) with").expect("Invalid regex"));

static REGEX_DESC_VICTIMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"You killed (.+)").expect("Invalid regex"));

static REGEX_VICTIM_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" and |, ").expect("Invalid regex"));

static REGEX_ILLEGAL_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\n\r\t]"#).expect("Invalid regex"));

/// 一份剪輯的事件時間軸
#[derive(Debug, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub entries: Vec<TimelineEntry>,
}

/// 時間軸上的單一事件
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 距離剪輯起點的時間位移；來源格式有時寫成數字、有時寫成數字字串
    #[serde(deserialize_with = "deserialize_event_time")]
    pub time: i64,
}

/// 從檔案載入時間軸
///
/// 格式錯誤回傳 `Err`，由呼叫端記錄並降級為空標籤
pub fn load_timeline(path: &Path) -> Result<Timeline> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("無法讀取時間軸: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("無法解析時間軸: {}", path.display()))
}

/// 推斷剪輯標籤
///
/// 從最後一個回合往前找，第一個有擊殺的回合決定標籤；
/// 全部回合都沒有擊殺時以最後一回合標為 Highlight。
/// 沒有任何回合開始事件則回傳空字串。
#[must_use]
pub fn classify_clip_label(timeline: &Timeline) -> String {
    let rounds = collect_round_starts(&timeline.entries);
    if rounds.is_empty() {
        return String::new();
    }

    // 擷取工具通常把高潮放在剪輯尾端，從最近的回合往回找
    for (i, round) in rounds.iter().enumerate().rev() {
        let round_end_time = rounds.get(i + 1).map(|next| next.time);
        let kills = count_round_kills(&timeline.entries, round.entry_index, round_end_time);

        if kills > 0 {
            return format!("_{}-{}", sanitize_map_name(&round.map), kill_tier(kills));
        }
    }

    let last = &rounds[rounds.len() - 1];
    format!("_{}-{HIGHLIGHT_TIER}", sanitize_map_name(&last.map))
}

/// 回合開始事件
#[derive(Debug)]
struct RoundStart {
    entry_index: usize,
    time: i64,
    map: String,
}

fn collect_round_starts(entries: &[TimelineEntry]) -> Vec<RoundStart> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == "event" && e.title.starts_with(ROUND_START_PREFIX))
        .filter_map(|(i, e)| {
            e.description.as_ref().map(|map| RoundStart {
                entry_index: i,
                time: e.time,
                map: map.clone(),
            })
        })
        .collect()
}

/// 統計單一回合內的擊殺數
///
/// 從回合開始事件往後掃，碰到下一回合的開始時間就停；
/// 單殺與多殺事件分開計數後相加
fn count_round_kills(
    entries: &[TimelineEntry],
    start_index: usize,
    round_end_time: Option<i64>,
) -> u32 {
    let mut kills = 0;

    for entry in &entries[start_index..] {
        if round_end_time.is_some_and(|end| entry.time >= end) {
            break;
        }
        if entry.kind != "event" {
            continue;
        }

        let title = entry.title.as_str();
        let is_multi_kill = MULTI_KILL_KEYWORDS.iter().any(|kw| title.contains(kw));

        if is_multi_kill {
            kills += count_multi_kill_victims(title, entry.description.as_deref());
        } else if title.starts_with(KILL_TITLE_PREFIX) && title != SELF_KILL_TITLE {
            kills += count_title_victims(title);
        }
    }

    kills
}

/// 從單殺事件標題取出受害者數
///
/// 標題形如 `You killed X with Y`，`X` 可能是 `A and B`；
/// 句型對不上時保守視為一殺
fn count_title_victims(title: &str) -> u32 {
    let Some(captures) = REGEX_TITLE_VICTIMS.captures(title) else {
        return 1;
    };
    captures
        .get(1)
        .map_or("", |m| m.as_str())
        .split(" and ")
        .filter(|v| !v.trim().is_empty())
        .count() as u32
}

/// 從多殺事件取出受害者數
///
/// 優先從描述解析出實際受害者名單，解析不到時退回關鍵字對照表
fn count_multi_kill_victims(title: &str, description: Option<&str>) -> u32 {
    let parsed = description.map_or(0, count_description_victims);
    if parsed > 0 {
        return parsed;
    }

    if title.contains("Ace") {
        5
    } else if title.contains("Quad kill") {
        4
    } else if title.contains("Triple kill") {
        3
    } else if title.contains("Double kill") {
        2
    } else {
        // 通用 "Multi kill" 標題看不出實際數量，保守估為 2
        2
    }
}

fn count_description_victims(description: &str) -> u32 {
    if !description.contains("You killed") {
        return 0;
    }

    // 先嘗試含武器的句型 "You killed X and Y with the Z"
    let captures = REGEX_DESC_VICTIMS_WITH_WEAPON
        .captures(description)
        .or_else(|| REGEX_DESC_VICTIMS.captures(description));

    let Some(captures) = captures else {
        return 0;
    };

    REGEX_VICTIM_SEPARATOR
        .split(captures.get(1).map_or("", |m| m.as_str()))
        .filter(|v| !v.trim().is_empty())
        .count() as u32
}

/// 擊殺數對應的標籤級別
fn kill_tier(kills: u32) -> &'static str {
    match kills {
        1 => "Kill",
        2 => "Double_kill",
        3 => "Triple_kill",
        4 => "Quad_kill",
        _ => "Ace",
    }
}

/// 清掉地圖名稱中不能進檔名的字元，空白換成底線
fn sanitize_map_name(map_name: &str) -> String {
    REGEX_ILLEGAL_FILENAME_CHARS
        .replace_all(map_name, "")
        .trim()
        .replace(' ', "_")
}

/// 接受 JSON 數字或數字字串的時間位移
fn deserialize_event_time<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct TimeVisitor;

    impl serde::de::Visitor<'_> for TimeVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer time offset, as a number or a string")
        }

        fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<i64, E> {
            Ok(value)
        }

        fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<i64, E> {
            i64::try_from(value).map_err(E::custom)
        }

        fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<i64, E> {
            Ok(value as i64)
        }

        fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<i64, E> {
            value.trim().parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(TimeVisitor)
}
