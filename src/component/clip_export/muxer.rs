//! 串流合併
//!
//! 把重組好的視訊與音訊串流不重新編碼地封裝成一個 MP4。
//! 以 trait 抽出介面，測試時注入假的合併器模擬成功與失敗。

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Command;

/// 串流合併器
///
/// 實作需回報成功與否；失敗時帶回診斷訊息，呼叫端據此決定重試
pub trait Muxer {
    fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()>;
}

/// 以 ffmpeg stream copy 合併
#[derive(Debug, Default)]
pub struct FfmpegMuxer;

impl FfmpegMuxer {
    #[must_use]
    pub fn build_command(video_path: &Path, audio_path: &Path, output_path: &Path) -> Command {
        let mut cmd = Command::new("ffmpeg");

        cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
            .arg("-i")
            .arg(video_path)
            .arg("-i")
            .arg(audio_path)
            .args(["-c", "copy"])
            .arg(output_path);

        cmd
    }
}

impl Muxer for FfmpegMuxer {
    fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        let output = Self::build_command(video_path, audio_path, output_path)
            .output()
            .with_context(|| format!("無法執行 ffmpeg: {}", output_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffmpeg 執行失敗: {}", stderr.trim());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::path::PathBuf;

    #[test]
    fn test_build_command_uses_stream_copy() {
        let cmd = FfmpegMuxer::build_command(
            Path::new("/tmp/stream0.m4s"),
            Path::new("/tmp/stream1.m4s"),
            Path::new("/out/clip.mp4"),
        );

        assert_eq!(cmd.get_program(), "ffmpeg");

        let args: Vec<PathBuf> = cmd.get_args().map(PathBuf::from).collect();
        assert!(args.contains(&PathBuf::from("-y")));
        assert!(args.contains(&PathBuf::from("/tmp/stream0.m4s")));
        assert!(args.contains(&PathBuf::from("/tmp/stream1.m4s")));
        assert_eq!(args.last().map(PathBuf::as_path), Some(Path::new("/out/clip.mp4")));

        // -c copy 必須成對出現（不重新編碼）
        let copy_index = args.iter().position(|a| a == OsStr::new("-c")).unwrap();
        assert_eq!(args[copy_index + 1], PathBuf::from("copy"));
    }

    #[test]
    fn test_video_input_precedes_audio_input() {
        let cmd = FfmpegMuxer::build_command(
            Path::new("video.m4s"),
            Path::new("audio.m4s"),
            Path::new("out.mp4"),
        );
        let args: Vec<PathBuf> = cmd.get_args().map(PathBuf::from).collect();

        let video_index = args.iter().position(|a| a == OsStr::new("video.m4s")).unwrap();
        let audio_index = args.iter().position(|a| a == OsStr::new("audio.m4s")).unwrap();
        assert!(video_index < audio_index);
    }
}
