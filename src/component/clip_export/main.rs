use super::folder_name::{CaptureInfo, FolderNameParser};
use super::muxer::{FfmpegMuxer, Muxer};
use super::plan::{FolderAction, FolderSnapshot, StreamTarget, plan_folder};
use super::segment_assembler::assemble_stream;
use super::timeline::{classify_clip_label, load_timeline};
use crate::config::Config;
use crate::tools::{ensure_directory_exists, scan_capture_folders, validate_directory_exists};
use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 目前只有 CS2 的時間軸格式受支援
const TIMELINE_APP_ID: &str = "730";
const VIDEO_TRACK: &str = "stream0";
const AUDIO_TRACK: &str = "stream1";
const PROCESSED_MARKER: &str = ".processed";

/// 單一資料夾的處理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FolderOutcome {
    Exported,
    AlreadyExported,
    SkippedProcessed,
    SkippedNotCapture,
    SkippedMissingStreams,
}

/// 一次匯出批次的統計
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    pub already_exported: usize,
    pub skipped_processed: usize,
    pub skipped_not_capture: usize,
    pub skipped_missing_streams: usize,
    pub failed: usize,
}

impl ExportSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.exported
            + self.already_exported
            + self.skipped_processed
            + self.skipped_not_capture
            + self.skipped_missing_streams
            + self.failed
    }

    fn record(&mut self, outcome: FolderOutcome) {
        match outcome {
            FolderOutcome::Exported => self.exported += 1,
            FolderOutcome::AlreadyExported => self.already_exported += 1,
            FolderOutcome::SkippedProcessed => self.skipped_processed += 1,
            FolderOutcome::SkippedNotCapture => self.skipped_not_capture += 1,
            FolderOutcome::SkippedMissingStreams => self.skipped_missing_streams += 1,
        }
    }
}

/// 剪輯匯出元件
pub struct ClipExport {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
    muxer: Box<dyn Muxer>,
}

impl ClipExport {
    #[must_use]
    pub fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self::with_muxer(config, shutdown_signal, Box::new(FfmpegMuxer))
    }

    /// 測試用：注入自訂的合併器
    #[must_use]
    pub fn with_muxer(
        config: Config,
        shutdown_signal: Arc<AtomicBool>,
        muxer: Box<dyn Muxer>,
    ) -> Self {
        Self {
            config,
            shutdown_signal,
            muxer,
        }
    }

    pub fn run(&self) -> Result<()> {
        println!("{}", style("=== 剪輯匯出 ===").cyan().bold());

        let source_dir =
            self.resolve_dir(&self.config.settings.source_dir, "請輸入錄製來源資料夾路徑")?;
        validate_directory_exists(&source_dir)?;

        let export_root =
            self.resolve_dir(&self.config.settings.export_dir, "請輸入匯出根目錄路徑")?;
        ensure_directory_exists(&export_root)?;

        let summary = self.export_all(&source_dir, &export_root)?;
        self.print_summary(&summary);

        Ok(())
    }

    /// 跑完整個來源資料夾的一輪匯出
    ///
    /// 每個資料夾獨立處理到底，失敗只影響自己；
    /// 中斷訊號在資料夾之間生效，處理中的資料夾會先做完
    pub fn export_all(&self, source_dir: &Path, export_root: &Path) -> Result<ExportSummary> {
        let parser = FolderNameParser::new(self.config.app_table.clone());
        let folders = scan_capture_folders(source_dir)?;

        let mut summary = ExportSummary::default();

        if folders.is_empty() {
            println!("{}", style("找不到任何資料夾").yellow());
            return Ok(summary);
        }

        info!("開始匯出批次，共 {} 個資料夾", folders.len());

        let progress_bar = ProgressBar::new(folders.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );

        for folder in &folders {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷訊號，停止處理");
                progress_bar.println(format!("{}", style("收到中斷訊號，停止處理").yellow()));
                break;
            }

            let folder_name = folder
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            progress_bar.set_message(folder_name.clone());

            match self.process_folder(folder, &folder_name, export_root, &parser, &progress_bar) {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    error!("處理 {folder_name} 失敗: {e:#}");
                    progress_bar.println(format!(
                        "  {} {folder_name}: {e:#}",
                        style("失敗").red().bold()
                    ));
                    summary.failed += 1;
                }
            }

            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        Ok(summary)
    }

    /// 處理單一資料夾：收集現況 → 決策 → 執行
    fn process_folder(
        &self,
        folder_path: &Path,
        folder_name: &str,
        export_root: &Path,
        parser: &FolderNameParser,
        progress_bar: &ProgressBar,
    ) -> Result<FolderOutcome> {
        let marker_path = folder_path.join(PROCESSED_MARKER);

        // 標記檢查放在名稱解析之前，標記過的資料夾完全不再讀取
        let snapshot = if marker_path.exists() {
            FolderSnapshot {
                marker_exists: true,
                streams: None,
            }
        } else {
            let Some(capture) = parser.parse(folder_name) else {
                progress_bar.println(format!(
                    "  {} {folder_name}：不是錄製資料夾",
                    style("跳過").dim()
                ));
                return Ok(FolderOutcome::SkippedNotCapture);
            };
            self.snapshot_folder(folder_path, &capture, export_root)?
        };

        match plan_folder(snapshot) {
            FolderAction::SkipProcessed => {
                progress_bar.println(format!(
                    "  {} {folder_name}：已標記為處理完成",
                    style("跳過").dim()
                ));
                Ok(FolderOutcome::SkippedProcessed)
            }
            FolderAction::SkipMissingStreams => {
                warn!("{folder_name} 裡找不到串流資料夾");
                progress_bar.println(format!(
                    "  {} {folder_name}：找不到串流資料夾",
                    style("跳過").yellow()
                ));
                Ok(FolderOutcome::SkippedMissingStreams)
            }
            FolderAction::MarkAlreadyExported { output_path } => {
                fs::write(&marker_path, "already exported")
                    .with_context(|| format!("無法寫入標記: {}", marker_path.display()))?;
                progress_bar.println(format!(
                    "  {} 輸出已存在：{}",
                    style("跳過").dim(),
                    output_path.display()
                ));
                Ok(FolderOutcome::AlreadyExported)
            }
            FolderAction::Export {
                stream_dir,
                output_path,
            } => self.export_folder(&stream_dir, &output_path, &marker_path, progress_bar),
        }
    }

    /// 收集決策所需的檔案系統現況
    fn snapshot_folder(
        &self,
        folder_path: &Path,
        capture: &CaptureInfo,
        export_root: &Path,
    ) -> Result<FolderSnapshot> {
        let Some(stream_dir) = find_stream_dir(&folder_path.join("video"), &capture.app_id) else {
            return Ok(FolderSnapshot::default());
        };

        let label = self.clip_label(folder_path, capture);
        let game_dir = export_root.join(&capture.game_name);
        ensure_directory_exists(&game_dir)?;

        let output_path = game_dir.join(format!("{}{}.mp4", capture.timestamp, label));
        let output_exists = output_path.exists();

        Ok(FolderSnapshot {
            marker_exists: false,
            streams: Some(StreamTarget {
                stream_dir,
                output_path,
                output_exists,
            }),
        })
    }

    /// 推斷要附加在檔名上的標籤
    ///
    /// 只有支援時間軸的遊戲會產生標籤；
    /// 時間軸缺漏或解析失敗都降級為空標籤，不影響匯出
    fn clip_label(&self, folder_path: &Path, capture: &CaptureInfo) -> String {
        if capture.app_id != TIMELINE_APP_ID {
            return String::new();
        }

        let Some(timeline_path) = find_timeline_file(folder_path) else {
            return String::new();
        };

        match load_timeline(&timeline_path) {
            Ok(timeline) => classify_clip_label(&timeline),
            Err(e) => {
                warn!("時間軸解析失敗，改用無標籤檔名: {e:#}");
                String::new()
            }
        }
    }

    /// 重組兩條串流並合併成最終輸出
    fn export_folder(
        &self,
        stream_dir: &Path,
        output_path: &Path,
        marker_path: &Path,
        progress_bar: &ProgressBar,
    ) -> Result<FolderOutcome> {
        info!(
            "開始匯出: {} -> {}",
            stream_dir.display(),
            output_path.display()
        );

        let video_path = assemble_stream(stream_dir, VIDEO_TRACK)?;
        let audio_path = match assemble_stream(stream_dir, AUDIO_TRACK) {
            Ok(path) => path,
            Err(e) => {
                // 音訊重組失敗時清掉已產生的視訊中繼檔
                let _ = fs::remove_file(&video_path);
                return Err(e);
            }
        };

        match self.muxer.mux(&video_path, &audio_path, output_path) {
            Ok(()) => {
                fs::remove_file(&video_path)
                    .with_context(|| format!("無法刪除中繼檔: {}", video_path.display()))?;
                fs::remove_file(&audio_path)
                    .with_context(|| format!("無法刪除中繼檔: {}", audio_path.display()))?;
                fs::write(marker_path, "processed")
                    .with_context(|| format!("無法寫入標記: {}", marker_path.display()))?;

                info!("匯出完成: {}", output_path.display());
                progress_bar.println(format!(
                    "  {} {}",
                    style("完成").green(),
                    output_path.display()
                ));
                Ok(FolderOutcome::Exported)
            }
            Err(e) => {
                // 合併失敗：寫到一半的輸出檔會被誤認成匯出成功，必須移除；
                // 中繼檔保留供檢查，不寫標記讓下次重跑
                if output_path.exists() {
                    let _ = fs::remove_file(output_path);
                }
                Err(e)
            }
        }
    }

    fn resolve_dir(&self, configured: &str, prompt: &str) -> Result<PathBuf> {
        let configured = configured.trim();
        if !configured.is_empty() {
            return Ok(PathBuf::from(configured));
        }

        let path: String = Input::new().with_prompt(prompt).interact_text()?;
        Ok(PathBuf::from(path.trim()))
    }

    fn print_summary(&self, summary: &ExportSummary) {
        println!();
        println!("{}", style("=== 匯出摘要 ===").cyan().bold());
        println!("  總計: {} 個資料夾", summary.total());
        println!("  匯出成功: {} 個", style(summary.exported).green());

        if summary.already_exported > 0 {
            println!("  輸出已存在: {} 個", style(summary.already_exported).dim());
        }
        if summary.skipped_processed > 0 {
            println!("  先前已處理: {} 個", style(summary.skipped_processed).dim());
        }
        if summary.skipped_not_capture > 0 {
            println!(
                "  非錄製資料夾: {} 個",
                style(summary.skipped_not_capture).dim()
            );
        }
        if summary.skipped_missing_streams > 0 {
            println!(
                "  缺少串流資料: {} 個",
                style(summary.skipped_missing_streams).yellow()
            );
        }
        if summary.failed > 0 {
            println!("  失敗: {} 個", style(summary.failed).red());
        }

        info!(
            "匯出批次完成 - 成功: {}, 已存在: {}, 跳過: {}, 失敗: {}",
            summary.exported,
            summary.already_exported,
            summary.skipped_processed + summary.skipped_not_capture + summary.skipped_missing_streams,
            summary.failed
        );
    }
}

/// 在 `video/` 底下找 `bg_<appid>_` 開頭的串流資料夾
///
/// 多個候選時取名稱排序最前者，確保跨平台結果一致
fn find_stream_dir(video_dir: &Path, app_id: &str) -> Option<PathBuf> {
    let prefix = format!("bg_{app_id}_");

    let mut candidates: Vec<PathBuf> = fs::read_dir(video_dir)
        .ok()?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .collect();

    candidates.sort();
    candidates.into_iter().next()
}

/// 找剪輯附帶的時間軸檔（`timelines/*.json`，取排序最前者）
fn find_timeline_file(folder_path: &Path) -> Option<PathBuf> {
    let timeline_dir = folder_path.join("timelines");

    let mut files: Vec<PathBuf> = fs::read_dir(&timeline_dir)
        .ok()?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    files.sort();
    files.into_iter().next()
}
