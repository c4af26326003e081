/// `transcript` 模組：逐字記錄面板的捲動狀態。
pub mod transcript;
