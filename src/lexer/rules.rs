//! The lexer's FSM states, actions, and rule table.
//!
//! A rule is a `(state, byte-class, action)` triple. Rules are compiled
//! into a dense `(state, byte) → action` table with one extra sentinel
//! column matching any byte the state has no explicit rule for. At most
//! one rule may claim a given `(state, byte)` pair; construction checks
//! this.

use std::sync::OnceLock;

use super::charset;
use super::optrie::OpTrie;

/// The FSM states.
///
/// `Init` is the initial state and the neutral state between tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Init,
    Name,
    Oper,
    Num,
    Str,
    StrEsc,
    StrEscH1,
    StrEscH2,
    Com,
    Com2,
    Com2Star,
    Pre,
}

pub(super) const STATE_COUNT: usize = 12;

impl State {
    /// Returns the state's name as used in diagnostics.
    pub(super) fn name(&self) -> &'static str {
        match self {
            State::Init => "init",
            State::Name => "name",
            State::Oper => "oper",
            State::Num => "num",
            State::Str => "str",
            State::StrEsc => "str_esc",
            State::StrEscH1 => "str_esc_h1",
            State::StrEscH2 => "str_esc_h2",
            State::Com => "com",
            State::Com2 => "com2",
            State::Com2Star => "com2_s",
            State::Pre => "pre",
        }
    }
}

/// What to do with the byte at the current position.
///
/// Each action decides the next state, the new start-of-token index, and
/// whether the byte is consumed; the interpretation lives in
/// [`Lexer::apply`](super::Lexer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Action {
    /// Skip a whitespace byte.
    Whitespace,
    /// First byte of a name.
    NameStart,
    /// Further name bytes.
    NameBody,
    /// Byte after a name: classify and push the token, retry the byte.
    NameEnd,
    /// Push a `;` token.
    Semicolon,
    /// Push a `,` token.
    Comma,
    /// Push a bracket token.
    Bracket,
    /// Operator byte in `Init` or `Oper`: consult the operator trie.
    OperatorStep,
    /// Non-operator byte after an operator: finish via the trie.
    OperatorEnd,
    /// First digit of a number.
    NumStart,
    /// Further digits or `.`.
    NumBody,
    /// Byte after a number: validate and push, retry the byte.
    NumEnd,
    /// Opening `"`.
    StrStart,
    /// Plain string byte (also re-entry from the escape states).
    StrBody,
    /// Backslash inside a string.
    StrEscape,
    /// `x` after a backslash.
    StrEscapeHexFirst,
    /// First hex digit of a `\xHH` escape.
    StrEscapeHexSecond,
    /// Closing `"`: decode and push the string token.
    StrEnd,
    /// Byte inside a `//` comment.
    CommentBody,
    /// Newline ending a `//` comment.
    CommentEnd,
    /// Byte inside a `/* */` comment.
    Comment2Body,
    /// `*` inside a `/* */` comment.
    Comment2Star,
    /// `/` after `*`: comment closed.
    Comment2End,
    /// Byte of a preprocessor line.
    PreprocessorBody,
    /// Newline ending a preprocessor line: execute it.
    PreprocessorEnd,
}

/// The byte class a rule applies to.
enum Class {
    /// An explicit set of bytes.
    Bytes(Vec<u8>),
    /// Any byte without an explicit rule in the state (the `-1` sentinel).
    Other,
}

/// Dense `(state, byte) → action` lookup table.
///
/// Column 256 holds the sentinel action for each state.
pub(super) struct RuleTable {
    entries: Vec<[Option<Action>; 257]>,
}

impl RuleTable {
    fn build(rules: Vec<(State, Class, Action)>) -> Self {
        let mut entries = vec![[None; 257]; STATE_COUNT];
        for (state, class, action) in rules {
            let row = &mut entries[state as usize];
            let columns: Vec<usize> = match class {
                Class::Bytes(bytes) => bytes.into_iter().map(|b| b as usize).collect(),
                Class::Other => vec![256],
            };
            for column in columns {
                assert!(
                    row[column].is_none(),
                    "duplicate lexer rule for state '{}' byte {}",
                    state.name(),
                    column
                );
                row[column] = Some(action);
            }
        }
        RuleTable { entries }
    }

    /// Looks up the action for `byte` in `state`, falling back to the
    /// state's sentinel rule.
    pub(super) fn lookup(&self, state: State, byte: u8) -> Option<Action> {
        let row = &self.entries[state as usize];
        row[byte as usize].or(row[256])
    }
}

/// Returns the shared rule table for the Tern token grammar.
pub(super) fn rule_table() -> &'static RuleTable {
    static TABLE: OnceLock<RuleTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let operator_char = OpTrie::alphabet();
        RuleTable::build(vec![
            // whitespace
            (State::Init, Class::Bytes(charset::whitespace()), Action::Whitespace),
            // operators
            (State::Init, Class::Bytes(operator_char.clone()), Action::OperatorStep),
            (State::Oper, Class::Bytes(operator_char), Action::OperatorStep),
            (State::Oper, Class::Other, Action::OperatorEnd),
            // names
            (
                State::Init,
                Class::Bytes({
                    let mut set = charset::letter();
                    set.push(b'_');
                    set
                }),
                Action::NameStart,
            ),
            (
                State::Name,
                Class::Bytes({
                    let mut set = charset::letter();
                    set.extend(charset::digit());
                    set.push(b'_');
                    set
                }),
                Action::NameBody,
            ),
            (State::Name, Class::Other, Action::NameEnd),
            // separators
            (State::Init, Class::Bytes(vec![b';']), Action::Semicolon),
            (State::Init, Class::Bytes(vec![b',']), Action::Comma),
            // numbers
            (State::Init, Class::Bytes(charset::digit()), Action::NumStart),
            (
                State::Num,
                Class::Bytes({
                    let mut set = charset::digit();
                    set.push(b'.');
                    set
                }),
                Action::NumBody,
            ),
            (State::Num, Class::Other, Action::NumEnd),
            // brackets
            (State::Init, Class::Bytes(charset::bracket()), Action::Bracket),
            // strings
            (State::Init, Class::Bytes(vec![b'"']), Action::StrStart),
            (State::Str, Class::Bytes(vec![b'\\']), Action::StrEscape),
            (State::Str, Class::Bytes(vec![b'"']), Action::StrEnd),
            (
                State::Str,
                Class::Bytes(charset::minus(charset::legible(), &[b'"', b'\\'])),
                Action::StrBody,
            ),
            (
                State::StrEsc,
                Class::Bytes(vec![b'"', b'\'', b'n', b't', b'\\']),
                Action::StrBody,
            ),
            (State::StrEsc, Class::Bytes(vec![b'x']), Action::StrEscapeHexFirst),
            (State::StrEscH1, Class::Bytes(charset::hex()), Action::StrEscapeHexSecond),
            (State::StrEscH2, Class::Bytes(charset::hex()), Action::StrBody),
            // preprocessor
            (State::Init, Class::Bytes(vec![b'#']), Action::PreprocessorBody),
            (
                State::Pre,
                Class::Bytes(charset::minus(charset::all(), &[b'\n'])),
                Action::PreprocessorBody,
            ),
            (State::Pre, Class::Bytes(vec![b'\n']), Action::PreprocessorEnd),
            // single-line comment
            (
                State::Com,
                Class::Bytes(charset::minus(charset::all(), &[b'\n'])),
                Action::CommentBody,
            ),
            (State::Com, Class::Bytes(vec![b'\n']), Action::CommentEnd),
            // multi-line comment
            (
                State::Com2,
                Class::Bytes(charset::minus(charset::all(), &[b'*'])),
                Action::Comment2Body,
            ),
            (State::Com2, Class::Bytes(vec![b'*']), Action::Comment2Star),
            (State::Com2Star, Class::Bytes(vec![b'*']), Action::Comment2Star),
            (State::Com2Star, Class::Bytes(vec![b'/']), Action::Comment2End),
            (
                State::Com2Star,
                Class::Bytes(charset::minus(charset::all(), &[b'/', b'*'])),
                Action::Comment2Body,
            ),
        ])
    })
}

/// Returns the shared operator trie.
pub(super) fn operator_trie() -> &'static OpTrie {
    static TRIE: OnceLock<OpTrie> = OnceLock::new();
    TRIE.get_or_init(OpTrie::build)
}

/// The reserved words of the language.
pub(super) const KEYWORDS: &[&str] = &[
    "struct", "function", "var", "const", "cast", "sizeof", "if", "while", "for", "return",
];

/// The primitive type names.
pub(super) const BUILTIN_TYPES: &[&str] = &[
    "i64", "i32", "i16", "i8", "u64", "u32", "u16", "u8", "float", "double", "void",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_explicit_byte() {
        let table = rule_table();
        assert_eq!(table.lookup(State::Init, b'a'), Some(Action::NameStart));
        assert_eq!(table.lookup(State::Init, b';'), Some(Action::Semicolon));
        assert_eq!(table.lookup(State::Init, b'('), Some(Action::Bracket));
    }

    #[test]
    fn test_lookup_sentinel() {
        let table = rule_table();
        // Any byte after a name that is not a name byte hits the sentinel.
        assert_eq!(table.lookup(State::Name, b'+'), Some(Action::NameEnd));
        assert_eq!(table.lookup(State::Name, b'\n'), Some(Action::NameEnd));
    }

    #[test]
    fn test_lookup_missing_rule() {
        let table = rule_table();
        // Init has no sentinel: an unknown byte has no action at all.
        assert_eq!(table.lookup(State::Init, b'@'), None);
        assert_eq!(table.lookup(State::Init, 0x00), None);
    }

    #[test]
    fn test_string_states() {
        let table = rule_table();
        assert_eq!(table.lookup(State::Str, b'\\'), Some(Action::StrEscape));
        assert_eq!(table.lookup(State::StrEsc, b'n'), Some(Action::StrBody));
        assert_eq!(
            table.lookup(State::StrEsc, b'x'),
            Some(Action::StrEscapeHexFirst)
        );
        assert_eq!(
            table.lookup(State::StrEscH1, b'A'),
            Some(Action::StrEscapeHexSecond)
        );
        assert_eq!(table.lookup(State::StrEscH2, b'7'), Some(Action::StrBody));
        // Unknown escape characters have no rule.
        assert_eq!(table.lookup(State::StrEsc, b'q'), None);
    }
}
