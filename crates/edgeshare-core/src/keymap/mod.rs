//! Key identifier table for cross-platform keyboard event mapping.
//!
//! Captured key events carry a host key code. Before they cross the wire they
//! are translated to a [`KeyIdentifier`], and the receiving peer translates the
//! identifier back into its own host key code before injection.
//!
//! The forward table (`host_vk::CANONICAL_KEYS`) is a compile-time constant in
//! insertion order. The reverse map is derived from it exactly once, the first
//! time [`KeyTable::global`] is called, and is read-only afterwards. When two
//! host codes share an identifier (numeric keypad digits, generic modifier
//! codes) the first-inserted host code is the one reachable in reverse.

use std::collections::HashMap;
use std::sync::OnceLock;

pub mod host_vk;
pub mod identifier;

pub use identifier::{KeyIdentifier, Modifiers};

/// Host key code as delivered by the capture hook.
///
/// Host codes use the Windows virtual-key numbering; capture adapters on
/// other platforms translate into this space before the event reaches the
/// state machine.
pub type HostKeyCode = u16;

/// Immutable bidirectional key table.
#[derive(Debug)]
pub struct KeyTable {
    forward: HashMap<HostKeyCode, KeyIdentifier>,
    reverse: HashMap<KeyIdentifier, HostKeyCode>,
}

static GLOBAL_TABLE: OnceLock<KeyTable> = OnceLock::new();

impl KeyTable {
    /// Builds a table from `(host code, identifier)` pairs in insertion order.
    ///
    /// A host code listed twice keeps its first identifier; an identifier
    /// listed twice resolves in reverse to its first host code.
    pub fn from_entries(entries: &[(HostKeyCode, KeyIdentifier)]) -> Self {
        let mut forward = HashMap::with_capacity(entries.len());
        let mut reverse = HashMap::with_capacity(entries.len());
        for &(code, id) in entries {
            forward.entry(code).or_insert(id);
            reverse.entry(id).or_insert(code);
        }
        Self { forward, reverse }
    }

    /// Returns the process-wide table built from [`host_vk::CANONICAL_KEYS`].
    pub fn global() -> &'static KeyTable {
        GLOBAL_TABLE.get_or_init(|| KeyTable::from_entries(host_vk::CANONICAL_KEYS))
    }

    /// Translates a host key code to its identifier.
    ///
    /// `None` means the key has no wire representation and should be ignored.
    pub fn to_identifier(&self, code: HostKeyCode) -> Option<KeyIdentifier> {
        self.forward.get(&code).copied()
    }

    /// Translates an identifier back to the canonical host key code.
    pub fn to_host_key_code(&self, id: KeyIdentifier) -> Option<HostKeyCode> {
        self.reverse.get(&id).copied()
    }

    /// Number of distinct host codes in the forward map.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_canonical_entries_round_trip_through_reverse_map() {
        let table = KeyTable::global();
        let mut seen = HashSet::new();
        for &(code, id) in host_vk::CANONICAL_KEYS {
            if !seen.insert(id) {
                continue; // alias, covered below
            }
            assert_eq!(table.to_identifier(code), Some(id), "forward lookup for 0x{code:02X}");
            assert_eq!(
                table.to_host_key_code(id),
                Some(code),
                "reverse lookup for {id:?} must return the canonical host code"
            );
        }
    }

    #[test]
    fn test_duplicate_identifier_resolves_to_first_inserted_host_code() {
        let table = KeyTable::global();
        let mut first: HashMap<KeyIdentifier, HostKeyCode> = HashMap::new();
        let mut aliases = 0;
        for &(code, id) in host_vk::CANONICAL_KEYS {
            match first.get(&id) {
                Some(&canonical) => {
                    aliases += 1;
                    assert_eq!(table.to_identifier(code), Some(id));
                    assert_eq!(table.to_host_key_code(id), Some(canonical));
                }
                None => {
                    first.insert(id, code);
                }
            }
        }
        assert!(aliases > 0, "table is expected to contain keypad aliases");
    }

    #[test]
    fn test_numpad_digit_aliases_main_row_digit() {
        let table = KeyTable::global();
        let numpad_7 = table.to_identifier(0x67).unwrap();
        let digit_7 = table.to_identifier(0x37).unwrap();
        assert_eq!(numpad_7, digit_7);
        assert_eq!(numpad_7.raw(), u16::from(b'7'));
        assert_eq!(table.to_host_key_code(numpad_7), Some(0x37));
    }

    #[test]
    fn test_left_and_right_modifiers_stay_distinct() {
        let table = KeyTable::global();
        assert_eq!(table.to_identifier(0xA0), Some(KeyIdentifier::SHIFT_LEFT));
        assert_eq!(table.to_identifier(0xA1), Some(KeyIdentifier::SHIFT_RIGHT));
        assert_eq!(table.to_identifier(0xA2), Some(KeyIdentifier::CONTROL_LEFT));
        assert_eq!(table.to_identifier(0xA3), Some(KeyIdentifier::CONTROL_RIGHT));
        // Generic VK_SHIFT aliases the left variant, which stays canonical.
        assert_eq!(table.to_identifier(0x10), Some(KeyIdentifier::SHIFT_LEFT));
        assert_eq!(table.to_host_key_code(KeyIdentifier::SHIFT_LEFT), Some(0xA0));
    }

    #[test]
    fn test_function_keys_cover_f1_to_f12() {
        let table = KeyTable::global();
        for n in 0..12u16 {
            let id = table.to_identifier(0x70 + n).unwrap();
            assert_eq!(id.raw(), 0xEFBE + n);
        }
    }

    #[test]
    fn test_unmapped_host_code_returns_none() {
        let table = KeyTable::global();
        assert_eq!(table.to_identifier(0x01), None); // VK_LBUTTON
        assert_eq!(table.to_identifier(0xFFFF), None);
    }

    #[test]
    fn test_from_entries_keeps_first_identifier_for_repeated_host_code() {
        let a = KeyIdentifier::from_char('a').unwrap();
        let b = KeyIdentifier::from_char('b').unwrap();
        let table = KeyTable::from_entries(&[(1, a), (1, b), (2, b)]);
        assert_eq!(table.to_identifier(1), Some(a));
        assert_eq!(table.to_host_key_code(b), Some(2));
        assert_eq!(table.len(), 2);
    }
}
