/// Parse options bitmask
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Options controlling which optional grammar features a parse session
/// recognizes. Stored as a plain bitmask so callers can pass bits the
/// crate does not know about yet; unknown bits are kept but ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Options(u32);

impl Options {
    pub const NONE: Options = Options(0);
    /// Recognize `[^label]` references and `[^label]:` definitions
    pub const FOOTNOTES: Options = Options(1 << 0);
    /// Attach the core "table" extension
    pub const TABLES: Options = Options(1 << 1);
    /// Attach the core "strikethrough" extension
    pub const STRIKETHROUGH: Options = Options(1 << 2);
    /// Attach the core "tasklist" extension
    pub const TASKLIST: Options = Options(1 << 3);
    /// Attach the core "autolink" extension (bare www/http links)
    pub const AUTOLINKS: Options = Options(1 << 4);
    /// Render every soft line break as a hard break
    pub const HARD_BREAKS: Options = Options(1 << 5);
    /// Pass raw HTML through to the renderer unmodified
    pub const UNSAFE_HTML: Options = Options(1 << 6);

    /// Everything GFM: tables, strikethrough, task lists, autolinks, footnotes.
    pub const GFM: Options =
        Options(Self::FOOTNOTES.0 | Self::TABLES.0 | Self::STRIKETHROUGH.0 | Self::TASKLIST.0 | Self::AUTOLINKS.0);

    /// Build options from a raw bitmask. Bits beyond the defined set are
    /// preserved so serialized options survive version skew.
    pub fn from_bits(bits: u32) -> Options {
        Options(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Options) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Options {
    type Output = Options;

    fn bitor(self, rhs: Options) -> Options {
        Options(self.0 | rhs.0)
    }
}

impl BitOrAssign for Options {
    fn bitor_assign(&mut self, rhs: Options) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Options {
    type Output = Options;

    fn bitand(self, rhs: Options) -> Options {
        Options(self.0 & rhs.0)
    }
}
