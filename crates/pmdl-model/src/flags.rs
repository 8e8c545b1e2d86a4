//! Special function flags attached to parts.

use std::fmt;

/// Function code stored in a part's `special_flag` field.
///
/// Only five codes are known. Any other value is kept as
/// [`SpecialFlag::Unknown`] so it is written back exactly as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "u32", into = "u32")
)]
pub enum SpecialFlag {
    /// No special function.
    #[default]
    None,
    /// First equipment slot.
    Equip1,
    /// Second equipment slot.
    Equip2,
    /// Face part.
    Face,
    /// Part can be hidden.
    Hideable,
    /// Unrecognized code, preserved verbatim.
    Unknown(u32),
}

impl SpecialFlag {
    /// All known flags, in display order.
    pub const KNOWN: [SpecialFlag; 5] = [
        SpecialFlag::None,
        SpecialFlag::Equip1,
        SpecialFlag::Equip2,
        SpecialFlag::Face,
        SpecialFlag::Hideable,
    ];

    /// Decode a stored code.
    pub const fn from_code(code: u32) -> Self {
        match code {
            0x00 => SpecialFlag::None,
            0x01 => SpecialFlag::Equip1,
            0x02 => SpecialFlag::Equip2,
            0x06 => SpecialFlag::Face,
            0x07 => SpecialFlag::Hideable,
            other => SpecialFlag::Unknown(other),
        }
    }

    /// The stored code.
    pub const fn code(&self) -> u32 {
        match self {
            SpecialFlag::None => 0x00,
            SpecialFlag::Equip1 => 0x01,
            SpecialFlag::Equip2 => 0x02,
            SpecialFlag::Face => 0x06,
            SpecialFlag::Hideable => 0x07,
            SpecialFlag::Unknown(code) => *code,
        }
    }

    /// Display label for known flags.
    pub const fn label(&self) -> Option<&'static str> {
        match self {
            SpecialFlag::None => Some("None"),
            SpecialFlag::Equip1 => Some("Equip. 1"),
            SpecialFlag::Equip2 => Some("Equip. 2"),
            SpecialFlag::Face => Some("Face"),
            SpecialFlag::Hideable => Some("Hideable"),
            SpecialFlag::Unknown(_) => None,
        }
    }

    /// Look up a flag from its label.
    ///
    /// Known labels match case-insensitively. A hexadecimal label such as
    /// `0x1F` (the form unknown codes are displayed in) decodes to that code.
    /// Anything else falls back to [`SpecialFlag::None`].
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();

        if let Some(flag) = Self::KNOWN
            .iter()
            .find(|flag| flag.label().is_some_and(|l| l.eq_ignore_ascii_case(label)))
        {
            return *flag;
        }

        label
            .strip_prefix("0x")
            .or_else(|| label.strip_prefix("0X"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .map(Self::from_code)
            .unwrap_or_default()
    }
}

impl From<u32> for SpecialFlag {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}

impl From<SpecialFlag> for u32 {
    fn from(flag: SpecialFlag) -> Self {
        flag.code()
    }
}

impl fmt::Display for SpecialFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "{:#X}", self.code()),
        }
    }
}
