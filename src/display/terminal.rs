use super::{Frame, Panel, Tone};
use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    execute,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Terminal, TerminalOptions, Viewport,
};
use std::io::{self, Stdout};

/// Rows reserved under the cursor for the status panel.
const PANEL_ROWS: u16 = 5;

/// Inline status panel drawn on the controlling terminal.
pub struct TerminalPanel {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalPanel {
    pub fn open() -> Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::with_options(
            backend,
            TerminalOptions {
                viewport: Viewport::Inline(PANEL_ROWS),
            },
        )
        .context("failed to initialise the status panel")?;
        execute!(io::stdout(), Hide).context("failed to hide the cursor")?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalPanel {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show);
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::White => Color::White,
        Tone::Red => Color::Red,
        Tone::Green => Color::Green,
    }
}

pub(super) fn frame_text(frame: &Frame) -> Text<'static> {
    let lines: Vec<Line<'static>> = frame
        .lines
        .iter()
        .map(|line| {
            let mut style = Style::default().fg(tone_color(line.tone));
            if line.headline {
                style = style.add_modifier(Modifier::BOLD);
            }
            Line::from(Span::styled(line.text, style))
        })
        .collect();
    Text::from(lines)
}

impl Panel for TerminalPanel {
    fn push(&mut self, frame: &Frame) -> Result<()> {
        let text = frame_text(frame);
        self.terminal
            .draw(|f| {
                let paragraph = Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .style(Style::default().bg(Color::Black))
                    .block(Block::default().borders(Borders::ALL).title("armpad"));
                f.render_widget(paragraph, f.size());
            })
            .context("failed to draw status panel")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::render_frame;
    use crate::state::DisplayState;

    #[test]
    fn overlay_text_has_two_lines_with_bold_headline() {
        let text = frame_text(&render_frame(DisplayState::WrongCodeOverlay));
        assert_eq!(text.lines.len(), 2);
        let headline = &text.lines[0].spans[0];
        assert_eq!(headline.content, "!! Wrong PIN !!");
        assert!(headline.style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(headline.style.fg, Some(Color::Red));
    }
}
