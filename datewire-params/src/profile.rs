//! Server profile and client charsets

use serde::{Deserialize, Serialize};

/// Protocol version spoken with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TdsVersion {
    Tds42,
    Tds50,
    #[default]
    Tds70,
}

impl TdsVersion {
    /// TDS 7.0 servers accept unicode parameter types
    pub fn supports_unicode(self) -> bool {
        self == TdsVersion::Tds70
    }
}

/// Client-side character encoding used for non-unicode text
pub trait Charset {
    /// Multi-byte (double byte character set) encoding
    fn is_dbcs(&self) -> bool;

    /// Every character of `text` has a representation in this charset
    fn can_encode(&self, text: &str) -> bool;

    /// Bytes `text` occupies once encoded
    fn encoded_len(&self, text: &str) -> usize;
}

/// Built-in charset models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharsetKind {
    /// Latin-1 style: one byte per character, U+0000..=U+00FF
    #[default]
    SingleByte,
    /// DBCS style: ASCII in one byte, every other BMP character in two
    DoubleByte,
}

impl Charset for CharsetKind {
    fn is_dbcs(&self) -> bool {
        matches!(self, CharsetKind::DoubleByte)
    }

    fn can_encode(&self, text: &str) -> bool {
        match self {
            CharsetKind::SingleByte => text.chars().all(|c| (c as u32) <= 0xFF),
            CharsetKind::DoubleByte => text.chars().all(|c| (c as u32) <= 0xFFFF),
        }
    }

    fn encoded_len(&self, text: &str) -> usize {
        match self {
            // Unencodable characters become a one-byte replacement
            CharsetKind::SingleByte => text.chars().count(),
            CharsetKind::DoubleByte => text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum(),
        }
    }
}

/// What the driver knows about the server it talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerProfile {
    pub version: TdsVersion,
    /// Send character parameters as unicode when the protocol allows it
    pub unicode: bool,
    pub charset: CharsetKind,
}

impl Default for ServerProfile {
    fn default() -> Self {
        Self {
            version: TdsVersion::Tds70,
            unicode: true,
            charset: CharsetKind::SingleByte,
        }
    }
}

impl ServerProfile {
    pub fn new(version: TdsVersion, unicode: bool, charset: CharsetKind) -> Self {
        Self { version, unicode, charset }
    }

    /// Unicode is both wanted and spoken
    pub fn use_unicode(&self) -> bool {
        self.unicode && self.version.supports_unicode()
    }
}
