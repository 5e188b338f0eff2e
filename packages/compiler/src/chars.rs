//! Character constants and predicates used by the stylesheet scanners.

// Special characters
pub const TAB: char = '\t';
pub const NEWLINE: char = '\n';
pub const RETURN: char = '\r';
pub const SPACE: char = ' ';

// Punctuation
pub const DQ: char = '"';
pub const HASH: char = '#';
pub const PERCENT: char = '%';
pub const AMPERSAND: char = '&';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const COMMA: char = ',';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const SEMICOLON: char = ';';
pub const GT: char = '>';
pub const AT: char = '@';

// Brackets and braces
pub const LBRACKET: char = '[';
pub const BACKSLASH: char = '\\';
pub const RBRACKET: char = ']';
pub const UNDERSCORE: char = '_';
pub const LBRACE: char = '{';
pub const RBRACE: char = '}';
pub const TILDE: char = '~';

/// Check if character is whitespace
pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == NEWLINE || ch == RETURN || ch == '\x0C'
}

/// Check if character is a digit
pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

/// Check if character is ASCII letter
pub fn is_ascii_letter(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_uppercase()
}

/// Check if character is ASCII hex digit
pub fn is_ascii_hex_digit(ch: char) -> bool {
    ch.is_ascii_hexdigit()
}

/// Check if character is a string quote
pub fn is_quote(ch: char) -> bool {
    ch == SQ || ch == DQ
}

/// Check if character is a selector combinator
pub fn is_combinator(ch: char) -> bool {
    ch == GT || ch == PLUS || ch == TILDE
}

/// Check if character can start an identifier
pub fn is_identifier_start(ch: char) -> bool {
    is_ascii_letter(ch) || ch == UNDERSCORE || ch == MINUS
}

/// Check if character can be part of an identifier
pub fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || is_digit(ch)
}
