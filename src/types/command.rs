//! Outbound commands understood by the meter firmware

use serde::{Deserialize, Serialize};

/// Commands the link knows how to send.
///
/// The write path accepts any text; these are the two the firmware answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Request an ADC measurement block
    Adc,

    /// Request the battery voltage
    Battery,
}

impl Command {
    /// Wire text for this command, written verbatim
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Adc => "ADC",
            Command::Battery => "BAT",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
