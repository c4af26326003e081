/// 可取得鍵盤焦點的兩個區域。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusArea {
    /// 對話逐字記錄（捲動瀏覽）。
    Transcript,
    /// 訊息輸入框。
    Composer,
}

impl FocusArea {
    pub fn label(&self) -> &'static str {
        match self {
            FocusArea::Transcript => "transcript",
            FocusArea::Composer => "composer",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            FocusArea::Transcript => FocusArea::Composer,
            FocusArea::Composer => FocusArea::Transcript,
        }
    }
}
