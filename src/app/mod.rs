//! `app` 模組是應用程式的核心。
//!
//! 它負責管理整體狀態、處理鍵盤與滑鼠輸入，
//! 並在每個 tick 將交換控制器的事件套用到對話上。

// --- 子模組宣告 ---

/// `chat` 模組：送出回合與重設對話的流程。
mod chat;
/// `files` 模組：文件挑選與文字萃取的流程。
mod files;
/// `init` 模組：負責 `App` 結構的初始化和設定載入。
mod init;
/// `keyboard` 模組：專門處理所有的鍵盤輸入事件。
mod keyboard;
/// `state` 模組：定義了 `App` 結構以及所有核心的狀態類型。
mod state;
/// `tick` 模組：處理應用程式的定時更新事件（tick）。
mod tick;

// --- 公共 API 重新導出 ---

pub use init::STATE_DIR;
pub use state::{App, Composer, DocumentPickerState, OverlayState};
