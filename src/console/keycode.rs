//! Keycode packing.
//!
//! Two directions are covered here:
//!
//! - [`keycode_for`] turns a character into the 4-byte key sequence a console
//!   input record is built from (`[virtual key, scan code, modifiers, ascii]`)
//! - [`encode_key_event`] turns a console key press into the bytes sent over the
//!   serial-over-LAN stream (VT100 sequences for navigation and function keys)

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Modifier bits carried in byte 2 of a [`KeySequence`].
pub const MOD_SHIFT: u8 = 0x01;
pub const MOD_CTRL: u8 = 0x02;
pub const MOD_ALT: u8 = 0x04;

const ESC: u8 = 0x1b;

/// `[virtual_key, scan_code, modifiers, ascii]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySequence(pub [u8; 4]);

impl KeySequence {
    pub fn virtual_key(&self) -> u8 {
        self.0[0]
    }

    pub fn scan_code(&self) -> u8 {
        self.0[1]
    }

    pub fn modifiers(&self) -> u8 {
        self.0[2]
    }

    pub fn ascii(&self) -> u8 {
        self.0[3]
    }
}

/// `(char, virtual key, set-1 scan code, shifted)` on a US layout.
///
/// Covers the space and all 32 ASCII punctuation characters.
pub const SPECIAL_KEYS: [(u8, u8, u8, bool); 33] = [
    (b' ', 0x20, 0x39, false),
    (b'!', 0x31, 0x02, true),
    (b'"', 0xde, 0x28, true),
    (b'#', 0x33, 0x04, true),
    (b'$', 0x34, 0x05, true),
    (b'%', 0x35, 0x06, true),
    (b'&', 0x37, 0x08, true),
    (b'\'', 0xde, 0x28, false),
    (b'(', 0x39, 0x0a, true),
    (b')', 0x30, 0x0b, true),
    (b'*', 0x38, 0x09, true),
    (b'+', 0xbb, 0x0d, true),
    (b',', 0xbc, 0x33, false),
    (b'-', 0xbd, 0x0c, false),
    (b'.', 0xbe, 0x34, false),
    (b'/', 0xbf, 0x35, false),
    (b':', 0xba, 0x27, true),
    (b';', 0xba, 0x27, false),
    (b'<', 0xbc, 0x33, true),
    (b'=', 0xbb, 0x0d, false),
    (b'>', 0xbe, 0x34, true),
    (b'?', 0xbf, 0x35, true),
    (b'@', 0x32, 0x03, true),
    (b'[', 0xdb, 0x1a, false),
    (b'\\', 0xdc, 0x2b, false),
    (b']', 0xdd, 0x1b, false),
    (b'^', 0x36, 0x07, true),
    (b'_', 0xbd, 0x0c, true),
    (b'`', 0xc0, 0x29, false),
    (b'{', 0xdb, 0x1a, true),
    (b'|', 0xdc, 0x2b, true),
    (b'}', 0xdd, 0x1b, true),
    (b'~', 0xc0, 0x29, true),
];

fn special_key(byte: u8) -> Option<KeySequence> {
    SPECIAL_KEYS
        .iter()
        .find(|(c, ..)| *c == byte)
        .map(|&(c, vk, scan, shifted)| {
            let mods = if shifted { MOD_SHIFT } else { 0 };
            KeySequence([vk, scan, mods, c])
        })
}

/// Generic encoding for everything outside [`SPECIAL_KEYS`].
///
/// Letters and digits use their uppercase ASCII value as virtual key. Control
/// characters other than backspace, tab, LF and CR become Ctrl plus the matching
/// letter. The scan code is left to the console.
pub fn fallback_keycode(byte: u8) -> KeySequence {
    match byte {
        b'A'..=b'Z' => KeySequence([byte, 0, MOD_SHIFT, byte]),
        0x08 | 0x09 | 0x0a | 0x0d => KeySequence([byte, 0, 0, byte]),
        0x01..=0x1a => KeySequence([byte + 0x40, 0, MOD_CTRL, byte]),
        _ => KeySequence([byte.to_ascii_uppercase(), 0, 0, byte]),
    }
}

/// Key sequence for a single character.
pub fn keycode_for(byte: u8) -> KeySequence {
    special_key(byte).unwrap_or_else(|| fallback_keycode(byte))
}

fn control_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' | 'A'..='Z' => Some((c.to_ascii_uppercase() as u8) & 0x1f),
        '@' | ' ' | '2' => Some(0x00),
        '[' | '3' => Some(ESC),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '7' | '/' => Some(0x1f),
        '?' | '8' => Some(0x7f),
        _ => None,
    }
}

/// Bytes sent over the SOL stream for a console key press.
///
/// Releases yield `None`, as do keys with no terminal representation
/// (modifier-only presses, media keys).
pub fn encode_key_event(event: &KeyEvent) -> Option<Vec<u8>> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let bytes: Vec<u8> = match event.code {
        KeyCode::Char(c) => {
            let mut out = Vec::with_capacity(5);
            if event.modifiers.contains(KeyModifiers::ALT) {
                out.push(ESC);
            }
            match control_byte(c) {
                Some(b) if event.modifiers.contains(KeyModifiers::CONTROL) => out.push(b),
                _ => {
                    let mut utf8 = [0u8; 4];
                    out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                }
            }
            out
        }
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Esc => vec![ESC],
        KeyCode::Null => vec![0x00],
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[1~".to_vec(),
        KeyCode::Insert => b"\x1b[2~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        KeyCode::End => b"\x1b[4~".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        KeyCode::F(n) => function_key(n)?.to_vec(),
        _ => return None,
    };

    Some(bytes)
}

fn function_key(n: u8) -> Option<&'static [u8]> {
    let seq: &'static [u8] = match n {
        1 => b"\x1bOP",
        2 => b"\x1bOQ",
        3 => b"\x1bOR",
        4 => b"\x1bOS",
        5 => b"\x1b[15~",
        6 => b"\x1b[17~",
        7 => b"\x1b[18~",
        8 => b"\x1b[19~",
        9 => b"\x1b[20~",
        10 => b"\x1b[21~",
        11 => b"\x1b[23~",
        12 => b"\x1b[24~",
        _ => return None,
    };
    Some(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn special_table_covers_space_and_punctuation() {
        let mut chars: Vec<u8> = SPECIAL_KEYS.iter().map(|(c, ..)| *c).collect();
        chars.sort_unstable();
        chars.dedup();
        assert_eq!(chars.len(), 33);

        let expected: Vec<u8> = (0x20u8..0x7f)
            .filter(|b| *b == b' ' || b.is_ascii_punctuation())
            .collect();
        assert_eq!(chars, expected);
    }

    #[test]
    fn special_characters_use_table_sequences() {
        assert_eq!(keycode_for(b' '), KeySequence([0x20, 0x39, 0, b' ']));
        assert_eq!(keycode_for(b'!'), KeySequence([0x31, 0x02, MOD_SHIFT, b'!']));
        assert_eq!(keycode_for(b'~'), KeySequence([0xc0, 0x29, MOD_SHIFT, b'~']));
        assert_eq!(keycode_for(b'`'), KeySequence([0xc0, 0x29, 0, b'`']));
        assert_eq!(keycode_for(b'|'), KeySequence([0xdc, 0x2b, MOD_SHIFT, b'|']));

        for &(c, vk, scan, shifted) in SPECIAL_KEYS.iter() {
            let seq = keycode_for(c);
            assert_eq!(seq.virtual_key(), vk);
            assert_eq!(seq.scan_code(), scan);
            assert_eq!(seq.modifiers() & MOD_SHIFT != 0, shifted);
            assert_eq!(seq.ascii(), c);
        }
    }

    #[test]
    fn letters_digits_and_controls_use_fallback() {
        assert_eq!(keycode_for(b'a'), KeySequence([b'A', 0, 0, b'a']));
        assert_eq!(keycode_for(b'Q'), KeySequence([b'Q', 0, MOD_SHIFT, b'Q']));
        assert_eq!(keycode_for(b'7'), KeySequence([b'7', 0, 0, b'7']));
        assert_eq!(keycode_for(0x03), KeySequence([b'C', 0, MOD_CTRL, 0x03]));
        assert_eq!(keycode_for(b'\r'), KeySequence([0x0d, 0, 0, b'\r']));
        assert_eq!(keycode_for(0x1b), KeySequence([0x1b, 0, 0, 0x1b]));
    }

    proptest! {
        #[test]
        fn non_special_bytes_get_generic_encoding(byte in any::<u8>()) {
            prop_assume!(!SPECIAL_KEYS.iter().any(|(c, ..)| *c == byte));
            let seq = keycode_for(byte);
            prop_assert_eq!(seq, fallback_keycode(byte));
            prop_assert_eq!(seq.scan_code(), 0);
            prop_assert_eq!(seq.ascii(), byte);
        }
    }

    #[test]
    fn encodes_printable_and_control_keys() {
        let none = KeyModifiers::NONE;
        assert_eq!(
            encode_key_event(&press(KeyCode::Char('x'), none)),
            Some(b"x".to_vec())
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::Char('é'), none)),
            Some("é".as_bytes().to_vec())
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(vec![0x03])
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::Char('['), KeyModifiers::CONTROL)),
            Some(vec![0x1b])
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::Char('b'), KeyModifiers::ALT)),
            Some(vec![0x1b, b'b'])
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::Enter, none)),
            Some(vec![b'\r'])
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::Backspace, none)),
            Some(vec![0x7f])
        );
    }

    #[test]
    fn encodes_navigation_and_function_keys() {
        let none = KeyModifiers::NONE;
        assert_eq!(
            encode_key_event(&press(KeyCode::Up, none)),
            Some(b"\x1b[A".to_vec())
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::PageDown, none)),
            Some(b"\x1b[6~".to_vec())
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::F(1), none)),
            Some(b"\x1bOP".to_vec())
        );
        assert_eq!(
            encode_key_event(&press(KeyCode::F(12), none)),
            Some(b"\x1b[24~".to_vec())
        );
        assert_eq!(encode_key_event(&press(KeyCode::F(13), none)), None);
    }

    #[test]
    fn ignores_key_release() {
        let mut event = press(KeyCode::Char('a'), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(encode_key_event(&event), None);
    }
}
