//! Pipeline mode inference

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which pipeline a request runs through. Derived from the inputs, never supplied by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Text-to-image
    Generate,
    /// Prompt-guided edit of a source image
    Edit,
    /// Prompt-free variation of a source image
    Variation,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Generate => "generate",
            Mode::Edit => "edit",
            Mode::Variation => "variation",
        }
    }

    pub fn needs_image(&self) -> bool {
        !matches!(self, Mode::Generate)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map input presence to a mode. `None` means the request carries neither an image nor a prompt.
pub fn resolve_mode(has_image: bool, has_prompt: bool) -> Option<Mode> {
    match (has_image, has_prompt) {
        (true, true) => Some(Mode::Edit),
        (true, false) => Some(Mode::Variation),
        (false, true) => Some(Mode::Generate),
        (false, false) => None,
    }
}
