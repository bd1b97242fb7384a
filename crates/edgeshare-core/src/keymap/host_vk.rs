//! Canonical host key code → [`KeyIdentifier`] table.
//!
//! Host key codes follow the Windows virtual-key numbering (`winuser.h`).
//! Order matters: the reverse map keeps the first host code listed for each
//! identifier, so main-keyboard and side-specific codes are listed before the
//! numeric keypad and the generic modifier codes that alias them.

use super::identifier::KeyIdentifier as K;
use super::HostKeyCode;

const fn ch(byte: u8) -> K {
    K::latin1(byte)
}

/// Forward table in insertion order.
pub const CANONICAL_KEYS: &[(HostKeyCode, K)] = &[
    // ── Space and letters (VK_A..VK_Z identify as lower-case) ────────────────
    (0x20, ch(b' ')),
    (0x41, ch(b'a')),
    (0x42, ch(b'b')),
    (0x43, ch(b'c')),
    (0x44, ch(b'd')),
    (0x45, ch(b'e')),
    (0x46, ch(b'f')),
    (0x47, ch(b'g')),
    (0x48, ch(b'h')),
    (0x49, ch(b'i')),
    (0x4A, ch(b'j')),
    (0x4B, ch(b'k')),
    (0x4C, ch(b'l')),
    (0x4D, ch(b'm')),
    (0x4E, ch(b'n')),
    (0x4F, ch(b'o')),
    (0x50, ch(b'p')),
    (0x51, ch(b'q')),
    (0x52, ch(b'r')),
    (0x53, ch(b's')),
    (0x54, ch(b't')),
    (0x55, ch(b'u')),
    (0x56, ch(b'v')),
    (0x57, ch(b'w')),
    (0x58, ch(b'x')),
    (0x59, ch(b'y')),
    (0x5A, ch(b'z')),
    // ── Digit row ────────────────────────────────────────────────────────────
    (0x30, ch(b'0')),
    (0x31, ch(b'1')),
    (0x32, ch(b'2')),
    (0x33, ch(b'3')),
    (0x34, ch(b'4')),
    (0x35, ch(b'5')),
    (0x36, ch(b'6')),
    (0x37, ch(b'7')),
    (0x38, ch(b'8')),
    (0x39, ch(b'9')),
    // ── Punctuation (US layout OEM keys) ─────────────────────────────────────
    (0xBA, ch(b';')),  // VK_OEM_1
    (0xBB, ch(b'=')),  // VK_OEM_PLUS
    (0xBC, ch(b',')),  // VK_OEM_COMMA
    (0xBD, ch(b'-')),  // VK_OEM_MINUS
    (0xBE, ch(b'.')),  // VK_OEM_PERIOD
    (0xBF, ch(b'/')),  // VK_OEM_2
    (0xC0, ch(b'`')),  // VK_OEM_3
    (0xDB, ch(b'[')),  // VK_OEM_4
    (0xDC, ch(b'\\')), // VK_OEM_5
    (0xDD, ch(b']')),  // VK_OEM_6
    (0xDE, ch(b'\'')), // VK_OEM_7
    (0xE2, ch(b'\\')), // VK_OEM_102, ISO extra key
    // ── Editing and control ──────────────────────────────────────────────────
    (0x08, K::BACKSPACE),
    (0x09, K::TAB),
    (0x0D, K::ENTER),
    (0x1B, K::ESCAPE),
    (0x2E, K::DELETE),
    (0x2D, K::INSERT),
    (0x13, K::PAUSE),
    (0x2C, K::PRINT_SCREEN),
    (0x5D, K::CONTEXT_MENU),
    // ── Navigation ───────────────────────────────────────────────────────────
    (0x24, K::HOME),
    (0x23, K::END),
    (0x21, K::PAGE_UP),
    (0x22, K::PAGE_DOWN),
    (0x25, K::ARROW_LEFT),
    (0x26, K::ARROW_UP),
    (0x27, K::ARROW_RIGHT),
    (0x28, K::ARROW_DOWN),
    // ── Function keys F1..F12 ────────────────────────────────────────────────
    (0x70, K::control(0xBE)),
    (0x71, K::control(0xBF)),
    (0x72, K::control(0xC0)),
    (0x73, K::control(0xC1)),
    (0x74, K::control(0xC2)),
    (0x75, K::control(0xC3)),
    (0x76, K::control(0xC4)),
    (0x77, K::control(0xC5)),
    (0x78, K::control(0xC6)),
    (0x79, K::control(0xC7)),
    (0x7A, K::control(0xC8)),
    (0x7B, K::control(0xC9)),
    // ── Modifiers, side-specific first ───────────────────────────────────────
    (0xA0, K::SHIFT_LEFT),
    (0xA1, K::SHIFT_RIGHT),
    (0xA2, K::CONTROL_LEFT),
    (0xA3, K::CONTROL_RIGHT),
    (0xA4, K::ALT_LEFT),
    (0xA5, K::ALT_RIGHT),
    (0x5B, K::META_LEFT),
    (0x5C, K::META_RIGHT),
    (0x10, K::SHIFT_LEFT),   // VK_SHIFT
    (0x11, K::CONTROL_LEFT), // VK_CONTROL
    (0x12, K::ALT_LEFT),     // VK_MENU
    // ── Lock keys ────────────────────────────────────────────────────────────
    (0x14, K::CAPS_LOCK),
    (0x90, K::NUM_LOCK),
    (0x91, K::SCROLL_LOCK),
    // ── Numeric keypad, aliasing the main-keyboard characters ────────────────
    (0x60, ch(b'0')),
    (0x61, ch(b'1')),
    (0x62, ch(b'2')),
    (0x63, ch(b'3')),
    (0x64, ch(b'4')),
    (0x65, ch(b'5')),
    (0x66, ch(b'6')),
    (0x67, ch(b'7')),
    (0x68, ch(b'8')),
    (0x69, ch(b'9')),
    (0x6A, ch(b'*')), // VK_MULTIPLY
    (0x6B, ch(b'+')), // VK_ADD
    (0x6C, ch(b',')), // VK_SEPARATOR
    (0x6D, ch(b'-')), // VK_SUBTRACT
    (0x6E, ch(b'.')), // VK_DECIMAL
    (0x6F, ch(b'/')), // VK_DIVIDE
];
