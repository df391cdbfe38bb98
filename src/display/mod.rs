//! Maps a [`DisplayState`] to panel content and pushes it to a physical or terminal panel.

mod terminal;

pub use terminal::TerminalPanel;

use crate::state::DisplayState;
use anyhow::Result;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tone {
    White,
    Red,
    Green,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameLine {
    pub text: &'static str,
    pub tone: Tone,
    /// Large font on the LCD, bold in the terminal.
    pub headline: bool,
}

/// Content for one refresh of the panel. Black background.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub state: DisplayState,
    pub lines: Vec<FrameLine>,
}

fn headline(text: &'static str, tone: Tone) -> FrameLine {
    FrameLine {
        text,
        tone,
        headline: true,
    }
}

/// Pure mapping; every state produces a frame.
pub fn render_frame(state: DisplayState) -> Frame {
    let lines = match state {
        DisplayState::Waiting => vec![headline("Wait...", Tone::White)],
        DisplayState::Armed => vec![headline("Armed", Tone::Red)],
        DisplayState::Disarmed => vec![headline("Disarmed", Tone::Green)],
        DisplayState::WrongCodeOverlay => vec![
            headline("!! Wrong PIN !!", Tone::Red),
            FrameLine {
                text: "Picture uploaded",
                tone: Tone::White,
                headline: false,
            },
        ],
    };
    Frame { state, lines }
}

/// Something that can show a frame.
pub trait Panel: Send {
    fn push(&mut self, frame: &Frame) -> Result<()>;
}

/// Panel for runs without a screen: each frame becomes a log line.
#[derive(Debug, Default)]
pub struct HeadlessPanel;

impl Panel for HeadlessPanel {
    fn push(&mut self, frame: &Frame) -> Result<()> {
        let text: Vec<&str> = frame.lines.iter().map(|line| line.text).collect();
        tracing::info!(state = ?frame.state, "panel: {}", text.join(" / "));
        Ok(())
    }
}
