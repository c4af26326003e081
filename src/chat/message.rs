use serde::{Deserialize, Serialize};

/// 逐字記錄中單一訊息的發話者標記。
///
/// 序列化時沿用既有存檔的標籤：`"user"`、`"ai"`、`"system"`，
/// 讓舊的對話存檔可以直接還原。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// 使用者輸入的訊息。
    User,
    /// 助理回覆的訊息。
    #[serde(rename = "ai")]
    Assistant,
    /// 系統產生的公告訊息（例如文件上傳通知）。
    System,
}

impl Sender {
    /// 對應到補全端點 wire 格式中的 `role` 欄位。
    pub fn wire_role(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
            Sender::System => "system",
        }
    }
}

/// 代表可見逐字記錄中的一個回合。
///
/// `content` 只有在訊息是進行中的占位訊息時才會被改寫；
/// 一旦回合定稿，內容即不再變動。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 發話者標記。
    pub sender: Sender,
    /// 訊息的文字內容。
    pub content: String,
}

impl Message {
    /// 建構函式。
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_role_mapping() {
        assert_eq!(Sender::User.wire_role(), "user");
        assert_eq!(Sender::Assistant.wire_role(), "assistant");
        assert_eq!(Sender::System.wire_role(), "system");
    }

    #[test]
    fn assistant_keeps_legacy_ai_tag_on_disk() {
        let message = Message::new(Sender::Assistant, "hello");
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"ai\""));

        let restored: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, message);
    }

    #[test]
    fn legacy_transcript_round_trips() {
        let raw = r#"[
            {"sender":"user","content":"hi"},
            {"sender":"ai","content":"hello"},
            {"sender":"system","content":"1 document uploaded."}
        ]"#;
        let messages: Vec<Message> = serde_json::from_str(raw).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert_eq!(messages[2].sender, Sender::System);
    }
}
