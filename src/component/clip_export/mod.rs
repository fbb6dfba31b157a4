//! 剪輯匯出元件
//!
//! 掃描擷取工具輸出的錄製資料夾，重組分段串流、推斷剪輯標籤，
//! 並以 ffmpeg 合併成可播放的 MP4 歸檔到各遊戲的匯出資料夾

mod folder_name;
mod main;
mod muxer;
mod plan;
mod segment_assembler;
mod timeline;

pub use folder_name::{CaptureInfo, FolderNameParser};
pub use main::{ClipExport, ExportSummary};
pub use muxer::{FfmpegMuxer, Muxer};
pub use plan::{FolderAction, FolderSnapshot, StreamTarget, plan_folder};
pub use segment_assembler::assemble_stream;
pub use timeline::{Timeline, TimelineEntry, classify_clip_label, load_timeline};
