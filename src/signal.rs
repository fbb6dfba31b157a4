use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 註冊 Ctrl-C 處理，回傳批次迴圈檢查用的旗標
///
/// 中斷只在資料夾之間生效，處理中的資料夾會先做完
#[must_use]
pub fn setup_shutdown_signal() -> Arc<AtomicBool> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        eprintln!("\n收到中斷信號，目前的剪輯處理完後停止...");
    })
    .expect("無法設定 Ctrl-C 處理器");

    shutdown_signal
}
