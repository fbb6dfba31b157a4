//! 單一資料夾的處理決策
//!
//! 把「這個資料夾接下來該做什麼」寫成純函式：
//! 協調器先收集檔案系統現況，這裡只做判斷，副作用回到協調器執行

use std::path::PathBuf;

/// 處理決策所需的檔案系統現況
#[derive(Debug, Default)]
pub struct FolderSnapshot {
    /// `.processed` 標記是否已存在
    pub marker_exists: bool,
    /// 巢狀串流資料夾與對應輸出目標；找不到串流資料夾時為 `None`
    pub streams: Option<StreamTarget>,
}

/// 找到的串流資料夾與它的輸出目標
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    /// `video/bg_<appid>_*` 資料夾
    pub stream_dir: PathBuf,
    /// `<匯出根目錄>/<遊戲>/<時間戳><標籤>.mp4`
    pub output_path: PathBuf,
    /// 目標輸出檔是否已存在
    pub output_exists: bool,
}

/// 單一資料夾的處理動作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderAction {
    /// 標記已存在，不再碰這個資料夾
    SkipProcessed,
    /// 找不到串流資料夾，跳過但不標記（下次重試）
    SkipMissingStreams,
    /// 輸出已存在，補寫標記即可
    MarkAlreadyExported { output_path: PathBuf },
    /// 完整跑重組與合併
    Export {
        stream_dir: PathBuf,
        output_path: PathBuf,
    },
}

/// 由現況決定動作
#[must_use]
pub fn plan_folder(snapshot: FolderSnapshot) -> FolderAction {
    if snapshot.marker_exists {
        return FolderAction::SkipProcessed;
    }

    let Some(target) = snapshot.streams else {
        return FolderAction::SkipMissingStreams;
    };

    if target.output_exists {
        FolderAction::MarkAlreadyExported {
            output_path: target.output_path,
        }
    } else {
        FolderAction::Export {
            stream_dir: target.stream_dir,
            output_path: target.output_path,
        }
    }
}
