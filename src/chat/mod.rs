//! 對話核心與串流重組邏輯。
//!
//! 此模組描述聊天流程的核心組件，包括逐字記錄的訊息類型、
//! 串流框架的解碼與增量萃取、對話的持久化儲存，
//! 以及驅動單次請求/回應交換的控制器。

// --- 子模組宣告 ---

/// `client` 模組：負責與遠端補全端點的 HTTP 通訊，
/// 定義 `CompletionBackend` trait 與 `reqwest` 實作。
pub mod client;

/// `config` 模組：負責定義聊天設定結構，例如 `config/chat.toml` 的解析格式，
/// 包括端點 URL、模型名稱、API 金鑰與系統提示詞。
pub mod config;

/// `context` 模組：管理附加文件的摘錄內容，
/// 並在送出回合時將其併入對外的提示文字。
pub mod context;

/// `document` 模組：文件文字萃取的邊界，
/// 定義 `TextExtractor` trait 與純文字實作。
pub mod document;

/// `exchange` 模組：提供 `ExchangeController`，
/// 負責一次完整的送出/串流/定稿回合的狀態機。
pub mod exchange;

/// `message` 模組：定義逐字記錄中的標準訊息格式，
/// 如 `Message`（單一回合）與 `Sender`（發話者標記）。
pub mod message;

/// `store` 模組：管理有序的對話記錄 (`ConversationStore`)
/// 與其載入/儲存邊界 (`PersistenceSlot`)。
pub mod store;

/// `stream` 模組：串流回應的重組核心，
/// 包括 `FrameDecoder`、`Delta` 與拉取式的 `DeltaStream`。
pub mod stream;

// --- 公共 API 重新導出 ---
// 將子模組中的關鍵項目提升到 `chat` 模組的頂層命名空間，
// 讓外部以 `crate::chat::Item` 的方式直接存取。

pub use client::{CompletionBackend, HttpCompletionClient, TransportError};
pub use config::ChatSettings;
pub use context::{DocumentContext, compose_outbound};
pub use exchange::{ExchangeController, ExchangePhase, TurnOutcome};
pub use message::{Message, Sender};
pub use store::{ConversationStore, FileSlot, PersistenceSlot};
pub use stream::{Delta, DeltaStream, FrameDecoder};
