use crate::state::Command;

/// Token emitted for the keypad Enter key.
pub const ENTER_TOKEN: &str = "ENTER";

/// Entries longer than this are still accepted but can only decode as a wrong code.
pub(super) const MAX_TYPED_CHARS: usize = 64;

/// The secret and the two reserved control tokens a completed entry is compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinTokens {
    pub secret: String,
    pub quit: String,
    pub refresh: String,
}

/// Turns key tokens into commands. Holds nothing but the current entry.
#[derive(Debug)]
pub struct PinDecoder {
    tokens: PinTokens,
    typed: String,
    overflowed: bool,
}

impl PinDecoder {
    pub fn new(tokens: PinTokens) -> Self {
        Self {
            tokens,
            typed: String::new(),
            overflowed: false,
        }
    }

    /// Feed one key-down token. Returns a command only for the Enter key.
    pub fn push(&mut self, token: &str) -> Option<Command> {
        if token == ENTER_TOKEN {
            let command = self.decode();
            self.typed.clear();
            self.overflowed = false;
            return Some(command);
        }
        if self.typed.len() + token.len() > MAX_TYPED_CHARS {
            self.overflowed = true;
        } else {
            self.typed.push_str(token);
        }
        None
    }

    pub fn buffered(&self) -> &str {
        &self.typed
    }

    fn decode(&self) -> Command {
        if self.overflowed {
            return Command::WrongCode;
        }
        let typed = self.typed.as_str();
        if typed == self.tokens.secret {
            Command::Right
        } else if typed == self.tokens.quit {
            Command::Quit
        } else if typed == self.tokens.refresh {
            Command::Refresh
        } else {
            Command::WrongCode
        }
    }
}
