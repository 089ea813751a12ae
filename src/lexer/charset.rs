//! Byte classes used when building the lexer rule table.
//!
//! Each function returns the set of bytes a rule applies to. The sets are
//! only consulted at table-construction time; the running FSM indexes a
//! dense table.

/// Space, tab, and newline.
pub(super) fn whitespace() -> Vec<u8> {
    vec![b' ', b'\t', b'\n']
}

/// ASCII decimal digits.
pub(super) fn digit() -> Vec<u8> {
    (b'0'..=b'9').collect()
}

/// ASCII letters, both cases.
pub(super) fn letter() -> Vec<u8> {
    (b'a'..=b'z').chain(b'A'..=b'Z').collect()
}

/// ASCII hexadecimal digits, both cases.
pub(super) fn hex() -> Vec<u8> {
    let mut set = digit();
    set.extend(b'a'..=b'f');
    set.extend(b'A'..=b'F');
    set
}

/// The six bracket characters.
pub(super) fn bracket() -> Vec<u8> {
    vec![b'(', b')', b'[', b']', b'{', b'}']
}

/// Printable ASCII plus tab; the bytes allowed inside string literals.
pub(super) fn legible() -> Vec<u8> {
    let mut set: Vec<u8> = (b' '..=b'~').collect();
    set.push(b'\t');
    set
}

/// Every byte value.
pub(super) fn all() -> Vec<u8> {
    (0..=255).collect()
}

/// `base` with every byte in `sub` removed.
pub(super) fn minus(base: Vec<u8>, sub: &[u8]) -> Vec<u8> {
    base.into_iter().filter(|b| !sub.contains(b)).collect()
}
