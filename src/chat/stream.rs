//! 串流回應的重組核心。
//!
//! 補全端點在 `stream=true` 時回傳以空白行分隔的文字框架，
//! 每個框架以 `data:` 標籤開頭，內容不是終止哨兵就是一段 JSON 增量。
//! 讀取邊界與框架邊界完全無關：一個框架可能橫跨多個讀取區塊，
//! 一個讀取區塊也可能包含多個框架。此模組負責在任意切割下
//! 重建完整框架，並將其分類為可窮舉處理的 `Delta` 變體。

use std::collections::VecDeque;
use std::fmt;

use futures_util::{Stream, StreamExt};
use serde::Deserialize;

/// 框架的識別標籤。不以此標籤開頭的框架會被靜默略過。
const FRAME_TAG: &str = "data:";
/// 助理回合結束的字面哨兵值。
const TERMINATION_SENTINEL: &str = "[DONE]";
/// 框架之間的分隔符：連續兩個換行。
const FRAME_DELIMITER: &[u8] = b"\n\n";

/// 從單一框架萃取出的增量，消費端必須窮舉處理三種變體。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// 一段助理回覆的文字內容。
    Content(String),
    /// 回合結束訊號，之後不會再有內容。
    Terminate,
    /// 無法解析的框架內容。保留原文以供記錄，不會中斷整個交換。
    Unparsable(String),
}

/// 將連續的位元組區塊切割為完整框架。
///
/// 以位元組為單位保留跨區塊的殘餘資料，確保被讀取邊界
/// 切開的 UTF-8 字元不會損毀；只有完整框架才會被解碼為文字。
/// 串流結束時殘餘的不完整框架會被捨棄。
#[derive(Debug, Default)]
pub struct FrameDecoder {
    carry: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 吸收一個讀取區塊，回傳其中所有已完整的框架（依抵達順序）。
    ///
    /// 可以被呼叫任意多次；同一個框架絕不會被重複發出，
    /// 橫跨區塊邊界的框架也絕不會遺失。
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = find_delimiter(&self.carry) {
            let frame: Vec<u8> = self.carry.drain(..pos + FRAME_DELIMITER.len()).collect();
            frames.push(String::from_utf8_lossy(&frame[..pos]).into_owned());
        }
        frames
    }

    /// 串流結束時呼叫，回傳被捨棄的殘餘位元組數（僅供記錄）。
    pub fn finish(self) -> usize {
        self.carry.len()
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}

// 串流增量的 wire 格式。只宣告實際會讀取的欄位。
#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// 將一個完整框架分類為 `Delta`。
///
/// - 不以 `data:` 開頭的框架回傳 `None`（靜默略過，連記錄都不需要）。
/// - 內容等於終止哨兵時回傳 `Terminate`。
/// - 成功解析且 `choices[0].delta.content` 非空時回傳 `Content`。
/// - 解析失敗、欄位缺席或內容為空時回傳 `Unparsable`，
///   由呼叫端決定要記錄或忽略；整個交換不因此中止。
pub fn extract_delta(frame: &str) -> Option<Delta> {
    let line = frame.trim();
    let body = line.strip_prefix(FRAME_TAG)?.trim_start();
    if body == TERMINATION_SENTINEL {
        return Some(Delta::Terminate);
    }
    match serde_json::from_str::<StreamChunk>(body) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .filter(|text| !text.is_empty());
            match content {
                Some(text) => Some(Delta::Content(text)),
                None => Some(Delta::Unparsable(body.to_string())),
            }
        }
        Err(_) => Some(Delta::Unparsable(body.to_string())),
    }
}

/// 串流讀取中途失敗。
#[derive(Debug, thiserror::Error)]
#[error("stream read failed: {0}")]
pub struct StreamReadError(pub String);

/// 拉取式的增量序列。
///
/// 包裝任意位元組區塊串流，內部持有 `FrameDecoder` 與待發增量佇列；
/// 每次 `next_delta().await` 產出一個 `Delta`，暫停點即是等待
/// 下一個讀取區塊的位置。輸入耗盡時回傳 `Ok(None)`。
pub struct DeltaStream<S> {
    chunks: S,
    decoder: FrameDecoder,
    pending: VecDeque<Delta>,
    exhausted: bool,
}

impl<S, E> DeltaStream<S>
where
    S: Stream<Item = Result<Vec<u8>, E>> + Unpin,
    E: fmt::Display,
{
    pub fn new(chunks: S) -> Self {
        Self {
            chunks,
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// 產出下一個增量；`Ok(None)` 代表串流已自然結束。
    pub async fn next_delta(&mut self) -> Result<Option<Delta>, StreamReadError> {
        loop {
            if let Some(delta) = self.pending.pop_front() {
                return Ok(Some(delta));
            }
            if self.exhausted {
                return Ok(None);
            }
            match self.chunks.next().await {
                Some(Ok(chunk)) => {
                    for frame in self.decoder.push(&chunk) {
                        if let Some(delta) = extract_delta(&frame) {
                            self.pending.push_back(delta);
                        }
                    }
                }
                Some(Err(err)) => return Err(StreamReadError(err.to_string())),
                None => {
                    // 結尾殘餘的不完整框架直接捨棄。
                    let leftover = std::mem::take(&mut self.decoder).finish();
                    if leftover > 0 {
                        log::debug!("discarding {leftover} trailing bytes of a partial frame");
                    }
                    self.exhausted = true;
                }
            }
        }
    }
}
