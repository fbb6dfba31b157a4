//! 整合測試 - 在暫存目錄建立模擬的錄製資料夾，跑完整匯出流程
//!
//! 合併器以假實作注入，不需要系統上有 ffmpeg

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use tempfile::TempDir;

use auto_clip_export::component::clip_export::{ClipExport, Muxer};
use auto_clip_export::config::{AppIdTable, Config, UserSettings};

/// 把兩條輸入串接後寫入輸出，並記錄每次呼叫
#[derive(Default)]
struct FakeMuxer {
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl Muxer for FakeMuxer {
    fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        let mut bytes = fs::read(video_path)?;
        bytes.extend(fs::read(audio_path)?);
        fs::write(output_path, bytes)?;
        self.calls.lock().unwrap().push(output_path.to_path_buf());
        Ok(())
    }
}

/// 模擬 ffmpeg 失敗：留下寫到一半的輸出檔再回報錯誤
struct FailingMuxer;

impl Muxer for FailingMuxer {
    fn mux(&self, _video_path: &Path, _audio_path: &Path, output_path: &Path) -> Result<()> {
        fs::write(output_path, b"partial")?;
        bail!("模擬的合併失敗")
    }
}

fn test_config() -> Config {
    let mut entries = HashMap::new();
    entries.insert("730".to_string(), "Counter-Strike 2".to_string());

    Config {
        settings: UserSettings::default(),
        app_table: AppIdTable::new(entries),
    }
}

fn exporter_with(muxer: Box<dyn Muxer>) -> ClipExport {
    ClipExport::with_muxer(test_config(), Arc::new(AtomicBool::new(false)), muxer)
}

/// 建立一個帶有兩條串流的錄製資料夾
fn create_capture_folder(root: &Path, name: &str, app_id: &str) -> PathBuf {
    let folder = root.join(name);
    let stream_dir = folder.join("video").join(format!("bg_{app_id}_abc123"));
    fs::create_dir_all(&stream_dir).unwrap();

    fs::write(stream_dir.join("init-stream0.m4s"), b"VINIT").unwrap();
    fs::write(stream_dir.join("chunk-stream0-1.m4s"), b"V1").unwrap();
    fs::write(stream_dir.join("chunk-stream0-2.m4s"), b"V2").unwrap();
    fs::write(stream_dir.join("init-stream1.m4s"), b"AINIT").unwrap();
    fs::write(stream_dir.join("chunk-stream1-1.m4s"), b"A1").unwrap();

    folder
}

fn write_timeline(folder: &Path, json: &str) {
    let timeline_dir = folder.join("timelines");
    fs::create_dir_all(&timeline_dir).unwrap();
    fs::write(timeline_dir.join("timeline_0.json"), json).unwrap();
}

fn stream_dir(folder: &Path, app_id: &str) -> PathBuf {
    folder.join("video").join(format!("bg_{app_id}_abc123"))
}

/// 測試 1: CS2 剪輯帶時間軸標籤匯出
#[test]
fn test_export_cs2_clip_with_label() {
    let source = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    let folder = create_capture_folder(source.path(), "clip_730_20240105_213045", "730");
    write_timeline(
        &folder,
        r#"{"entries": [
            {"type": "event", "title": "Start of round 3", "description": "Mirage", "time": 0},
            {"type": "event", "title": "You killed Alice with the AK-47", "time": 5},
            {"type": "event", "title": "You killed Bob with the AWP", "time": 8}
        ]}"#,
    );

    let muxer = FakeMuxer::default();
    let exporter = exporter_with(Box::new(FakeMuxer {
        calls: Arc::clone(&muxer.calls),
    }));
    let summary = exporter.export_all(source.path(), export.path()).unwrap();

    assert_eq!(summary.exported, 1);
    assert_eq!(summary.failed, 0);

    // 時間戳補了 +2 小時，標籤來自有擊殺的回合
    let output = export
        .path()
        .join("Counter-Strike 2")
        .join("2024-01-05_23.30.45_Mirage-Double_kill.mp4");
    assert!(output.exists(), "輸出檔應該存在: {}", output.display());
    assert_eq!(fs::read(&output).unwrap(), b"VINITV1V2AINITA1");

    // 標記寫入、中繼檔清除
    assert_eq!(fs::read_to_string(folder.join(".processed")).unwrap(), "processed");
    let streams = stream_dir(&folder, "730");
    assert!(!streams.join("stream0.m4s").exists());
    assert!(!streams.join("stream1.m4s").exists());

    println!("✓ CS2 剪輯匯出測試通過");
}

/// 測試 2: 沒有時間軸支援的遊戲匯出無標籤檔名
#[test]
fn test_export_other_game_without_label() {
    let source = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    create_capture_folder(source.path(), "clip_440_20240105_213045", "440");

    let exporter = exporter_with(Box::new(FakeMuxer::default()));
    let summary = exporter.export_all(source.path(), export.path()).unwrap();

    assert_eq!(summary.exported, 1);

    // 440 不在對照表中，使用合成名稱
    let output = export
        .path()
        .join("App_440")
        .join("2024-01-05_23.30.45.mp4");
    assert!(output.exists());

    println!("✓ 無時間軸遊戲匯出測試通過");
}

/// 測試 3: 非錄製資料夾與缺串流資料夾的跳過行為
#[test]
fn test_skip_rules() {
    let source = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    // 名稱不符合慣例
    fs::create_dir(source.path().join("screenshots")).unwrap();
    // 名稱符合但沒有 video/bg_* 資料夾
    let broken = source.path().join("clip_730_20240105_213045");
    fs::create_dir_all(broken.join("video")).unwrap();

    let muxer_calls = Arc::new(Mutex::new(Vec::new()));
    let exporter = exporter_with(Box::new(FakeMuxer {
        calls: Arc::clone(&muxer_calls),
    }));
    let summary = exporter.export_all(source.path(), export.path()).unwrap();

    assert_eq!(summary.skipped_not_capture, 1);
    assert_eq!(summary.skipped_missing_streams, 1);
    assert_eq!(summary.exported, 0);
    assert!(muxer_calls.lock().unwrap().is_empty());

    // 兩者都不寫標記，下次執行可重試
    assert!(!source.path().join("screenshots/.processed").exists());
    assert!(!broken.join(".processed").exists());

    println!("✓ 跳過規則測試通過");
}

/// 測試 4: 重跑整批不做重複工作
#[test]
fn test_second_run_is_idempotent() {
    let source = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    create_capture_folder(source.path(), "clip_730_20240105_213045", "730");
    create_capture_folder(source.path(), "clip_440_20240106_080000", "440");

    let muxer_calls = Arc::new(Mutex::new(Vec::new()));
    let exporter = exporter_with(Box::new(FakeMuxer {
        calls: Arc::clone(&muxer_calls),
    }));

    let first = exporter.export_all(source.path(), export.path()).unwrap();
    assert_eq!(first.exported, 2);
    assert_eq!(muxer_calls.lock().unwrap().len(), 2);

    let second = exporter.export_all(source.path(), export.path()).unwrap();
    assert_eq!(second.exported, 0);
    assert_eq!(second.skipped_processed, 2);
    // 合併器沒有被再次呼叫
    assert_eq!(muxer_calls.lock().unwrap().len(), 2);

    println!("✓ 重跑冪等測試通過");
}

/// 測試 5: 輸出已存在時只補標記，不重組也不合併
#[test]
fn test_existing_output_only_marks() {
    let source = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    let folder = create_capture_folder(source.path(), "clip_440_20240105_213045", "440");

    // 預先放好同名輸出檔
    let game_dir = export.path().join("App_440");
    fs::create_dir_all(&game_dir).unwrap();
    let output = game_dir.join("2024-01-05_23.30.45.mp4");
    fs::write(&output, b"previous export").unwrap();

    let muxer_calls = Arc::new(Mutex::new(Vec::new()));
    let exporter = exporter_with(Box::new(FakeMuxer {
        calls: Arc::clone(&muxer_calls),
    }));
    let summary = exporter.export_all(source.path(), export.path()).unwrap();

    assert_eq!(summary.already_exported, 1);
    assert!(muxer_calls.lock().unwrap().is_empty());

    // 原輸出檔不被動到，標記內容註明已匯出
    assert_eq!(fs::read(&output).unwrap(), b"previous export");
    assert_eq!(
        fs::read_to_string(folder.join(".processed")).unwrap(),
        "already exported"
    );

    println!("✓ 輸出已存在測試通過");
}

/// 測試 6: 合併失敗不寫標記、清掉殘缺輸出，之後可重試成功
#[test]
fn test_mux_failure_is_retryable() {
    let source = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    let folder = create_capture_folder(source.path(), "clip_440_20240105_213045", "440");
    let output = export
        .path()
        .join("App_440")
        .join("2024-01-05_23.30.45.mp4");

    let failing = exporter_with(Box::new(FailingMuxer));
    let summary = failing.export_all(source.path(), export.path()).unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.exported, 0);
    // 殘缺的輸出檔必須移除，否則下次會被誤認成匯出成功
    assert!(!output.exists());
    assert!(!folder.join(".processed").exists());
    // 中繼檔保留供檢查
    let streams = stream_dir(&folder, "440");
    assert!(streams.join("stream0.m4s").exists());
    assert!(streams.join("stream1.m4s").exists());

    // 修好合併器後重跑同一批
    let retry = exporter_with(Box::new(FakeMuxer::default()));
    let summary = retry.export_all(source.path(), export.path()).unwrap();

    assert_eq!(summary.exported, 1);
    assert!(output.exists());
    assert_eq!(fs::read_to_string(folder.join(".processed")).unwrap(), "processed");
    assert!(!streams.join("stream0.m4s").exists());

    println!("✓ 合併失敗重試測試通過");
}

/// 測試 7: 時間軸毀損時降級為無標籤匯出
#[test]
fn test_corrupt_timeline_degrades_to_unlabeled() {
    let source = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    let folder = create_capture_folder(source.path(), "clip_730_20240105_213045", "730");
    write_timeline(&folder, "{ this is not json");

    let exporter = exporter_with(Box::new(FakeMuxer::default()));
    let summary = exporter.export_all(source.path(), export.path()).unwrap();

    assert_eq!(summary.exported, 1);
    assert!(
        export
            .path()
            .join("Counter-Strike 2")
            .join("2024-01-05_23.30.45.mp4")
            .exists()
    );

    println!("✓ 時間軸毀損降級測試通過");
}

/// 測試 8: 缺 init 片段的資料夾失敗但不影響其他資料夾
#[test]
fn test_broken_segments_do_not_stop_the_batch() {
    let source = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    let broken = create_capture_folder(source.path(), "clip_440_20240105_213045", "440");
    fs::remove_file(stream_dir(&broken, "440").join("init-stream0.m4s")).unwrap();
    create_capture_folder(source.path(), "clip_440_20240106_080000", "440");

    let exporter = exporter_with(Box::new(FakeMuxer::default()));
    let summary = exporter.export_all(source.path(), export.path()).unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.exported, 1);
    // 失敗的資料夾不寫標記
    assert!(!broken.join(".processed").exists());

    println!("✓ 批次容錯測試通過");
}
