//! 串流片段重組
//!
//! 擷取工具將每條串流切成 init 片段加上編號的 chunk 片段，
//! 這裡依編號順序接回成單一可餵給 ffmpeg 的 .m4s 檔

use anyhow::{Context, Result, bail};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// 重組一條串流
///
/// 讀取 `init-<track>.m4s` 與所有 `chunk-<track>-<N>.m4s`，
/// 依 `<N>` 的數值順序（非字典序）串接寫入 `<track>.m4s` 並回傳其路徑。
/// 產生的中繼檔由呼叫端負責刪除。
pub fn assemble_stream(stream_dir: &Path, track: &str) -> Result<PathBuf> {
    let init_path = stream_dir.join(format!("init-{track}.m4s"));
    if !init_path.exists() {
        bail!("找不到 init 片段: {}", init_path.display());
    }

    let chunks = collect_chunks(stream_dir, track)?;
    if chunks.is_empty() {
        bail!("{} 在 {} 中沒有任何 chunk 片段", track, stream_dir.display());
    }

    let output_path = stream_dir.join(format!("{track}.m4s"));
    let output = File::create(&output_path)
        .with_context(|| format!("無法建立輸出檔: {}", output_path.display()))?;
    let mut writer = BufWriter::new(output);

    // 逐檔串流複製，避免把整條串流讀進記憶體
    append_file(&mut writer, &init_path)?;
    for chunk in &chunks {
        append_file(&mut writer, chunk)?;
    }
    writer
        .flush()
        .with_context(|| format!("無法寫入輸出檔: {}", output_path.display()))?;

    Ok(output_path)
}

/// 列出並依編號排序 chunk 片段
fn collect_chunks(stream_dir: &Path, track: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("chunk-{track}-");
    let mut chunks: Vec<(u64, PathBuf)> = Vec::new();

    let entries = fs::read_dir(stream_dir)
        .with_context(|| format!("無法讀取串流資料夾: {}", stream_dir.display()))?;

    for entry in entries.filter_map(std::result::Result::ok) {
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if let Some(index) = parse_chunk_index(name, &prefix) {
            chunks.push((index, entry.path()));
        }
    }

    // "10" 必須排在 "9" 之後，所以依解析出的數字排序
    chunks.sort_by_key(|(index, _)| *index);
    Ok(chunks.into_iter().map(|(_, path)| path).collect())
}

/// 從 `chunk-<track>-<N>.m4s` 取出 `<N>`
fn parse_chunk_index(file_name: &str, prefix: &str) -> Option<u64> {
    let remainder = file_name.strip_prefix(prefix)?;
    let digits = remainder.strip_suffix(".m4s").unwrap_or(remainder);
    digits.parse().ok()
}

fn append_file(writer: &mut BufWriter<File>, path: &Path) -> Result<()> {
    let mut reader =
        File::open(path).with_context(|| format!("無法讀取片段: {}", path.display()))?;
    io::copy(&mut reader, writer)
        .with_context(|| format!("無法寫入片段: {}", path.display()))?;
    Ok(())
}
