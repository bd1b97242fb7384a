//! Platform-neutral key identifiers and the modifier mask.
//!
//! Identifiers occupy two disjoint ranges of a 16-bit space:
//!
//! | Range           | Meaning                                            |
//! |-----------------|----------------------------------------------------|
//! | `0x0020–0x00FF` | Printable characters; value is the Latin-1 code point |
//! | `0xEF00–0xEFFF` | Control, navigation, function, lock and modifier keys |
//!
//! Letters are identified by their unshifted (lower-case) character. Shift,
//! Control, Alt and Meta state never changes the identifier; it travels in
//! the separate 4-bit [`Modifiers`] mask.

use std::borrow::Cow;
use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

const PRINTABLE_START: u16 = 0x0020;
const PRINTABLE_END: u16 = 0x00FF;
const CONTROL_START: u16 = 0xEF00;
const CONTROL_END: u16 = 0xEFFF;

/// Stable 16-bit key identifier used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyIdentifier(u16);

impl KeyIdentifier {
    pub const BACKSPACE: Self = Self(0xEF08);
    pub const TAB: Self = Self(0xEF09);
    pub const ENTER: Self = Self(0xEF0D);
    pub const PAUSE: Self = Self(0xEF13);
    pub const SCROLL_LOCK: Self = Self(0xEF14);
    pub const ESCAPE: Self = Self(0xEF1B);
    pub const HOME: Self = Self(0xEF50);
    pub const ARROW_LEFT: Self = Self(0xEF51);
    pub const ARROW_UP: Self = Self(0xEF52);
    pub const ARROW_RIGHT: Self = Self(0xEF53);
    pub const ARROW_DOWN: Self = Self(0xEF54);
    pub const PAGE_UP: Self = Self(0xEF55);
    pub const PAGE_DOWN: Self = Self(0xEF56);
    pub const END: Self = Self(0xEF57);
    pub const PRINT_SCREEN: Self = Self(0xEF61);
    pub const INSERT: Self = Self(0xEF63);
    pub const CONTEXT_MENU: Self = Self(0xEF67);
    pub const NUM_LOCK: Self = Self(0xEF7F);
    pub const F1: Self = Self(0xEFBE);
    pub const F12: Self = Self(0xEFC9);
    pub const SHIFT_LEFT: Self = Self(0xEFE1);
    pub const SHIFT_RIGHT: Self = Self(0xEFE2);
    pub const CONTROL_LEFT: Self = Self(0xEFE3);
    pub const CONTROL_RIGHT: Self = Self(0xEFE4);
    pub const CAPS_LOCK: Self = Self(0xEFE5);
    pub const META_LEFT: Self = Self(0xEFE7);
    pub const META_RIGHT: Self = Self(0xEFE8);
    pub const ALT_LEFT: Self = Self(0xEFE9);
    pub const ALT_RIGHT: Self = Self(0xEFEA);
    pub const SUPER_LEFT: Self = Self(0xEFEB);
    pub const SUPER_RIGHT: Self = Self(0xEFEC);
    pub const DELETE: Self = Self(0xEFFF);

    /// Validates a raw wire value.
    ///
    /// Returns `None` if `raw` lies outside both identifier ranges.
    pub fn new(raw: u16) -> Option<Self> {
        if (PRINTABLE_START..=PRINTABLE_END).contains(&raw)
            || (CONTROL_START..=CONTROL_END).contains(&raw)
        {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Identifier for a printable character given as its Latin-1 byte.
    ///
    /// Callers guarantee `byte >= 0x20`; used to build the const tables.
    pub(crate) const fn latin1(byte: u8) -> Self {
        Self(byte as u16)
    }

    /// Identifier for a control key at `0xEF00 + offset`.
    pub(crate) const fn control(offset: u8) -> Self {
        Self(CONTROL_START | offset as u16)
    }

    /// Identifier for a printable character, if it lies in the Latin-1 range.
    pub fn from_char(c: char) -> Option<Self> {
        let cp = u32::from(c);
        if (u32::from(PRINTABLE_START)..=u32::from(PRINTABLE_END)).contains(&cp) {
            Some(Self(cp as u16))
        } else {
            None
        }
    }

    /// The raw 16-bit wire value.
    pub fn raw(self) -> u16 {
        self.0
    }

    /// Returns `true` for the printable-character range.
    pub fn is_printable(self) -> bool {
        self.0 <= PRINTABLE_END
    }

    /// The character this identifier stands for, if printable.
    pub fn as_char(self) -> Option<char> {
        if self.is_printable() {
            char::from_u32(u32::from(self.0))
        } else {
            None
        }
    }

    /// The modifier bit this key contributes while held, or an empty mask.
    pub fn modifier_bit(self) -> Modifiers {
        match self {
            Self::SHIFT_LEFT | Self::SHIFT_RIGHT => Modifiers::SHIFT,
            Self::CONTROL_LEFT | Self::CONTROL_RIGHT => Modifiers::CONTROL,
            Self::ALT_LEFT | Self::ALT_RIGHT => Modifiers::ALT,
            Self::META_LEFT | Self::META_RIGHT | Self::SUPER_LEFT | Self::SUPER_RIGHT => {
                Modifiers::META
            }
            _ => Modifiers::empty(),
        }
    }

    /// Stable textual name, as carried by `KeyPress` packets.
    ///
    /// Printable keys render as their character (`"a"`, `"/"`), except the
    /// space bar which is `"Space"`. Control keys use fixed names such as
    /// `"Escape"` or `"F5"`. Identifiers without a name render as `"U+XXXX"`.
    pub fn name(self) -> Cow<'static, str> {
        if self.0 == 0x20 {
            return Cow::Borrowed("Space");
        }
        if let Some(c) = self.as_char().filter(|c| !c.is_control()) {
            return Cow::Owned(c.to_string());
        }
        if let Some(n) = self.function_key_number() {
            return Cow::Owned(format!("F{n}"));
        }
        match CONTROL_NAMES.iter().find(|(id, _)| *id == self.0) {
            Some((_, name)) => Cow::Borrowed(name),
            None => Cow::Owned(format!("U+{:04X}", self.0)),
        }
    }

    /// Parses a name produced by [`KeyIdentifier::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "Space" {
            return Some(Self(0x20));
        }
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_char(c);
        }
        if let Some(hex) = name.strip_prefix("U+") {
            return u16::from_str_radix(hex, 16).ok().and_then(Self::new);
        }
        if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u16>().ok()) {
            if (1..=12).contains(&n) {
                return Some(Self(Self::F1.0 + n - 1));
            }
        }
        CONTROL_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(id, _)| Self(*id))
    }

    fn function_key_number(self) -> Option<u16> {
        (Self::F1.0..=Self::F12.0)
            .contains(&self.0)
            .then(|| self.0 - Self::F1.0 + 1)
    }
}

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

const CONTROL_NAMES: &[(u16, &str)] = &[
    (0xEF08, "Backspace"),
    (0xEF09, "Tab"),
    (0xEF0D, "Enter"),
    (0xEF13, "Pause"),
    (0xEF14, "ScrollLock"),
    (0xEF1B, "Escape"),
    (0xEF50, "Home"),
    (0xEF51, "ArrowLeft"),
    (0xEF52, "ArrowUp"),
    (0xEF53, "ArrowRight"),
    (0xEF54, "ArrowDown"),
    (0xEF55, "PageUp"),
    (0xEF56, "PageDown"),
    (0xEF57, "End"),
    (0xEF61, "PrintScreen"),
    (0xEF63, "Insert"),
    (0xEF67, "ContextMenu"),
    (0xEF7F, "NumLock"),
    (0xEFE1, "ShiftLeft"),
    (0xEFE2, "ShiftRight"),
    (0xEFE3, "ControlLeft"),
    (0xEFE4, "ControlRight"),
    (0xEFE5, "CapsLock"),
    (0xEFE7, "MetaLeft"),
    (0xEFE8, "MetaRight"),
    (0xEFE9, "AltLeft"),
    (0xEFEA, "AltRight"),
    (0xEFEB, "SuperLeft"),
    (0xEFEC, "SuperRight"),
    (0xEFFF, "Delete"),
];

/// Modifier state carried alongside a key identifier (low 4 bits only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const SHIFT: Self = Self(0x01);
    pub const CONTROL: Self = Self(0x02);
    pub const ALT: Self = Self(0x04);
    pub const META: Self = Self(0x08);

    const MASK: u8 = 0x0F;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a mask from a wire byte, discarding the unused high bits.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
