//! 文件文字萃取的邊界。
//!
//! 萃取器把一份上傳文件轉成單一文字區塊（各頁以換行連接）。
//! 對核心而言這是一個黑盒協作者：失敗時整個上傳流程被放棄，
//! 不會設定任何文件內容。

use anyhow::{Context, Result};

/// 把一份文件的原始位元組轉成單一文字區塊。
pub trait TextExtractor {
    /// 萃取器的名稱，用於記錄與介面顯示。
    fn name(&self) -> &str;

    /// 回傳整份文件的文字，各頁以換行分隔。
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// 純文字文件的萃取器。
///
/// 換頁字元視為頁界，與換行一樣輸出為 `\n`；
/// 非 UTF-8 的內容視為萃取失敗。
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain text"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(bytes).context("document is not valid UTF-8 text")?;
        Ok(text.replace("\r\n", "\n").replace('\u{c}', "\n"))
    }
}
