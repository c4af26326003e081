use std::path::Path;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use unicode_width::UnicodeWidthChar;

use crate::app::{App, DocumentPickerState, OverlayState};
use crate::chat::exchange::ExchangePhase;
use crate::chat::message::Sender;
use crate::definitions::FocusArea;

mod theme;
use theme::*;

pub fn render(f: &mut Frame<'_>, app: &mut App) {
    let size = f.size();
    if size.width < 60 || size.height < 16 {
        let block = Paragraph::new("Terminal window too small, resize to at least 60x16.")
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title("murmur")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(FG_PRIMARY).bg(POPUP_BG)),
            )
            .style(Style::default().fg(FG_PRIMARY).bg(BG_PRIMARY));
        f.render_widget(block, size);
        return;
    }

    let base = Block::default().style(Style::default().bg(BG_PRIMARY));
    f.render_widget(base, size);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(size);

    render_header(f, app, vertical[0]);
    render_transcript(f, app, vertical[1]);
    render_composer(f, app, vertical[2]);
    render_status_bar(f, app, vertical[3]);

    if let Some(OverlayState::DocumentPicker(picker)) = &app.overlay {
        render_document_picker(f, &app.workspace_root, picker, size);
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let header_text = format!(" murmur | {} ({}) ", app.assistant_name, app.model_name);
    let header =
        Paragraph::new(header_text).style(Style::default().bg(BAR_BG).fg(BAR_TEXT));
    f.render_widget(header, area);
}

fn render_transcript(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER_IDLE))
        .title(Span::styled("Conversation", Style::default().fg(FG_PRIMARY)))
        .style(Style::default().bg(BG_PANEL));
    if app.focus == FocusArea::Transcript {
        block = block.border_style(
            Style::default()
                .fg(BORDER_FOCUS)
                .add_modifier(Modifier::BOLD),
        );
    }
    let inner = block.inner(area);
    let wrap_width = inner.width.max(1) as usize;

    let mut lines: Vec<Line> = Vec::new();
    if app.conversation.is_empty() {
        lines.push(Line::from(Span::styled(
            "No messages yet.",
            Style::default().fg(FG_DIM),
        )));
        lines.push(Line::from(Span::styled(
            "Type a prompt below and press Enter.",
            Style::default().fg(FG_DIM),
        )));
    } else {
        for message in app.conversation.messages() {
            let (label, label_style, body_style) = match message.sender {
                Sender::User => (
                    String::from("You"),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                    Style::default().fg(Color::White),
                ),
                Sender::Assistant => (
                    app.assistant_name.clone(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                    Style::default().fg(FG_PRIMARY),
                ),
                Sender::System => (
                    String::from("System"),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::ITALIC),
                    Style::default().fg(FG_DIM),
                ),
            };
            lines.push(Line::from(Span::styled(label, label_style)));
            if message.content.is_empty() {
                push_wrapped_line(&mut lines, "", body_style, wrap_width);
            } else {
                for line in message.content.lines() {
                    push_wrapped_line(&mut lines, line, body_style, wrap_width);
                }
            }
            lines.push(Line::default());
        }
        lines.pop();
    }

    // Bottom-anchored window over the wrapped lines.
    let height = inner.height as usize;
    let total = lines.len();
    app.transcript.clamp(total.saturating_sub(height));
    let end = total - app.transcript.offset().min(total);
    let start = end.saturating_sub(height);
    let visible: Vec<Line> = lines[start..end].to_vec();

    let paragraph = Paragraph::new(visible)
        .block(block)
        .style(Style::default().bg(BG_PANEL));
    f.render_widget(paragraph, area);
}

fn render_composer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER_IDLE))
        .title(Span::styled("Message", Style::default().fg(FG_PRIMARY)))
        .style(Style::default().bg(BG_PANEL));
    if app.focus == FocusArea::Composer {
        block = block.border_style(
            Style::default()
                .fg(BORDER_FOCUS)
                .add_modifier(Modifier::BOLD),
        );
    }
    let inner = block.inner(area);
    let wrap_width = inner.width.max(1) as usize;

    let mut lines: Vec<Line> = Vec::new();
    if app.composer.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Ask something to {}...", app.assistant_name),
            Style::default().fg(FG_DIM),
        )));
    } else {
        for line in app.composer.buffer().split('\n') {
            push_wrapped_line(&mut lines, line, Style::default().fg(Color::White), wrap_width);
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(BG_PANEL));
    f.render_widget(paragraph, area);

    if app.overlay.is_none() && app.focus == FocusArea::Composer {
        let (col, row) = app.composer.cursor_display_position(wrap_width);
        let row = row.min(inner.height.saturating_sub(1));
        f.set_cursor(inner.x + col.min(inner.width.saturating_sub(1)), inner.y + row);
    }
}

fn render_status_bar(f: &mut Frame<'_>, app: &App, area: Rect) {
    let phase = match app.exchange.phase() {
        ExchangePhase::Idle => "idle",
        ExchangePhase::Sending => "sending",
        ExchangePhase::Streaming => "streaming",
        ExchangePhase::Finalizing => "finalizing",
        ExchangePhase::Errored => "errored",
    };
    let document = if app.document.is_empty() {
        "no document"
    } else {
        "document attached"
    };
    let scroll = if app.transcript.is_following() {
        "following"
    } else {
        "scrolled (End to follow)"
    };
    let footer_text = format!(
        " {} | {} | {} | {} | {} ",
        phase,
        document,
        scroll,
        app.focus.label(),
        app.status_message
    );
    let footer = Paragraph::new(footer_text).style(Style::default().bg(BAR_BG).fg(BAR_TEXT));
    f.render_widget(footer, area);
}

fn render_document_picker(
    f: &mut Frame<'_>,
    workspace_root: &Path,
    picker: &DocumentPickerState,
    area: Rect,
) {
    let popup_width = area.width.saturating_sub(8).min(70).max(24);
    let popup_height = (picker.entries.len() as u16 + 2)
        .min(16)
        .min(area.height.saturating_sub(4));
    let popup_area = Rect {
        x: area.x + (area.width.saturating_sub(popup_width)) / 2,
        y: area.y + (area.height.saturating_sub(popup_height)) / 2,
        width: popup_width,
        height: popup_height,
    };
    f.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = picker
        .entries
        .iter()
        .map(|path| {
            let display = path
                .strip_prefix(workspace_root)
                .unwrap_or(path)
                .display()
                .to_string();
            ListItem::new(display).style(Style::default().fg(POPUP_TEXT))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(picker.selected));

    let list = List::new(items)
        .block(
            Block::default()
                .title("Attach Document")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(POPUP_BORDER))
                .style(Style::default().bg(POPUP_BG)),
        )
        .highlight_style(
            Style::default()
                .bg(POPUP_HIGHLIGHT_BG)
                .fg(POPUP_HIGHLIGHT_TEXT)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, popup_area, &mut state);
}

fn push_wrapped_line(lines: &mut Vec<Line>, text: &str, style: Style, width: usize) {
    for segment in wrap_to_width(text, width) {
        lines.push(Line::from(Span::styled(segment, style)));
    }
}

fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut result = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1).max(1);
        if current_width + ch_width > width && !current.is_empty() {
            result.push(current);
            current = String::new();
            current_width = 0;
        }
        current.push(ch);
        current_width += ch_width;
    }
    result.push(current);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_display_width() {
        let wrapped = wrap_to_width("abcdef", 3);
        assert_eq!(wrapped, vec!["abc", "def"]);

        // 全形字元佔兩欄。
        let wrapped = wrap_to_width("宇宙宇宙", 4);
        assert_eq!(wrapped, vec!["宇宙", "宇宙"]);
    }

    #[test]
    fn empty_text_still_produces_one_line() {
        assert_eq!(wrap_to_width("", 10), vec![String::new()]);
    }
}
