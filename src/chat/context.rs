//! 附加文件摘錄的保存與注入。
//!
//! 文件內容不屬於對話記錄本身：它存在於程序生命週期的暫態狀態中，
//! 在每次送出回合時被讀取並截斷後併入對外文字。注入後**不會**被消耗，
//! 同一份摘錄會持續附加到之後的每個回合，直到明確重設為止。

/// 注入時的字元預算：摘錄最多取前 2000 個字元。
pub const EXCERPT_CHAR_BUDGET: usize = 2000;

/// 摘錄前的固定前導文字。
const EXCERPT_PREAMBLE: &str = "\n\nHere is the content of a related document:\n";

/// 最近一次上傳文件萃取出的文字內容。
#[derive(Debug, Default)]
pub struct DocumentContext {
    excerpt: Option<String>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由文件萃取流程設定內容。
    pub fn set(&mut self, text: impl Into<String>) {
        self.excerpt = Some(text.into());
    }

    /// 只有明確重設才會清空。
    pub fn clear(&mut self) {
        self.excerpt = None;
    }

    pub fn excerpt(&self) -> Option<&str> {
        self.excerpt.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.excerpt.as_deref().is_none_or(str::is_empty)
    }
}

/// 組合對外送出的文字。純函式：不修改 `document`，沒有副作用。
///
/// 摘錄為空時原樣回傳輸入；否則在輸入之後接上固定前導文字
/// 與摘錄的前 [`EXCERPT_CHAR_BUDGET`] 個字元。
pub fn compose_outbound(input: &str, document: &DocumentContext) -> String {
    match document.excerpt() {
        Some(text) if !text.is_empty() => {
            let mut outbound =
                String::with_capacity(input.len() + EXCERPT_PREAMBLE.len() + text.len().min(EXCERPT_CHAR_BUDGET * 4));
            outbound.push_str(input);
            outbound.push_str(EXCERPT_PREAMBLE);
            outbound.extend(text.chars().take(EXCERPT_CHAR_BUDGET));
            outbound
        }
        _ => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_returns_input_unchanged() {
        let document = DocumentContext::new();
        assert_eq!(compose_outbound("hello", &document), "hello");
    }

    #[test]
    fn excerpt_is_appended_after_the_preamble() {
        let mut document = DocumentContext::new();
        document.set("page one\npage two");
        let outbound = compose_outbound("summarize this", &document);
        assert!(outbound.starts_with("summarize this"));
        assert!(outbound.contains(EXCERPT_PREAMBLE));
        assert!(outbound.ends_with("page one\npage two"));
    }

    #[test]
    fn excerpt_is_truncated_to_exactly_the_budget() {
        let mut document = DocumentContext::new();
        document.set("宇".repeat(EXCERPT_CHAR_BUDGET + 500));
        let outbound = compose_outbound("q", &document);
        let appended = outbound
            .strip_prefix("q")
            .and_then(|rest| rest.strip_prefix(EXCERPT_PREAMBLE))
            .unwrap();
        assert_eq!(appended.chars().count(), EXCERPT_CHAR_BUDGET);
    }

    #[test]
    fn injection_does_not_consume_the_context() {
        let mut document = DocumentContext::new();
        document.set("kept");
        let _ = compose_outbound("first", &document);
        let second = compose_outbound("second", &document);
        assert!(second.ends_with("kept"));
        assert_eq!(document.excerpt(), Some("kept"));
    }

    #[test]
    fn explicitly_empty_excerpt_behaves_like_no_context() {
        let mut document = DocumentContext::new();
        document.set("");
        assert!(document.is_empty());
        assert_eq!(compose_outbound("hi", &document), "hi");
    }
}
