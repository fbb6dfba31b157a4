use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 列出來源根目錄下的候選錄製資料夾
///
/// 只看第一層子資料夾，依名稱排序讓批次順序穩定；
/// 名稱是否符合錄製命名慣例由後續解析決定
pub fn scan_capture_folders(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut folders: Vec<PathBuf> = WalkDir::new(source_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .collect();

    folders.sort();
    Ok(folders)
}
