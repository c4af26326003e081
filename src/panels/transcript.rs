/// Scroll state of the transcript panel.
///
/// The offset counts wrapped lines up from the bottom; zero means the view
/// follows the newest content, which is where streaming updates land.
#[derive(Debug, Default)]
pub struct TranscriptPanel {
    offset: usize,
}

impl TranscriptPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_following(&self) -> bool {
        self.offset == 0
    }

    /// Scrolls towards older content.
    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.offset.saturating_add(lines);
    }

    /// Scrolls towards the newest content.
    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    /// Snaps back to the bottom of the transcript.
    pub fn follow(&mut self) {
        self.offset = 0;
    }

    /// Called by the renderer once the real line count is known.
    pub fn clamp(&mut self, max_offset: usize) {
        self.offset = self.offset.min(max_offset);
    }
}
