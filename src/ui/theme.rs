use ratatui::style::Color;

pub const BG_PRIMARY: Color = Color::Rgb(0, 0, 0);
pub const BG_PANEL: Color = Color::Rgb(12, 12, 12);
pub const FG_PRIMARY: Color = Color::Rgb(190, 190, 190);
pub const FG_DIM: Color = Color::Rgb(128, 128, 128);

pub const BAR_BG: Color = Color::Rgb(23, 52, 127);
pub const BAR_TEXT: Color = Color::Rgb(235, 240, 255);

pub const POPUP_BG: Color = Color::Rgb(79, 79, 79);
pub const POPUP_BORDER: Color = Color::Rgb(208, 208, 208);
pub const POPUP_TEXT: Color = Color::Rgb(240, 240, 240);
pub const POPUP_HIGHLIGHT_BG: Color = Color::Rgb(220, 220, 220);
pub const POPUP_HIGHLIGHT_TEXT: Color = Color::Rgb(30, 30, 30);

pub const BORDER_IDLE: Color = Color::Rgb(61, 120, 120);
pub const BORDER_FOCUS: Color = Color::Rgb(187, 94, 0);
