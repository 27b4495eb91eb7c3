/// Tokenizer for express-style route patterns
///
/// Splits a pattern such as `/users/:id(\d+)?` into literal runs and captures.
/// All functions are **pure**: same input → same output, no side effects.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Recognizes, in a single left-to-right scan:
///
/// 1. an escaped character (`\:`),
/// 2. a named capture with optional prefix, custom sub-pattern and modifier (`/:id(\d+)?`),
/// 3. a bare parenthesized group (`/(\d+)`),
/// 4. a bare `*` wildcard (`/*`).
static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(\\.)",
        "|",
        r"([/.])?(?:(?::(\w+)(?:\(((?:\\.|[^\\()])+)\))?|\(((?:\\.|[^\\()])+)\))([+*?])?|(\*))",
    ))
    .unwrap()
});

/// Name under which a capture is stored after a match
///
/// Positional captures are numbered per parse call, left to right, starting at 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyName {
    /// Explicit `:name`
    Named(String),
    /// Unnamed group or `*` wildcard
    Index(usize),
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyName::Named(name) => f.write_str(name),
            KeyName::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for KeyName {
    fn from(name: &str) -> Self {
        KeyName::Named(name.to_string())
    }
}

impl From<usize> for KeyName {
    fn from(index: usize) -> Self {
        KeyName::Index(index)
    }
}

/// Structured description of one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Lookup name in the params mapping
    pub name: KeyName,
    /// Delimiter character written before the capture (`/`, `.` or empty)
    pub prefix: String,
    /// Character that separates repeated values and bounds the default sub-pattern
    pub delimiter: String,
    /// `?` or `*` modifier
    pub optional: bool,
    /// `+` or `*` modifier
    pub repeat: bool,
    /// Sub-pattern used inside the compiled expression
    pub pattern: String,
    /// Bare `*` wildcard; `/` is written unencoded when building paths
    pub asterisk: bool,
}

impl Key {
    /// Key for a capturing group found in a prebuilt expression
    pub fn positional(index: usize) -> Self {
        Key {
            name: KeyName::Index(index),
            prefix: String::new(),
            delimiter: String::new(),
            optional: false,
            repeat: false,
            pattern: String::new(),
            asterisk: false,
        }
    }
}

/// One element of a parsed pattern
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::pattern::{parse, KeyName, Token};
///
/// let tokens = parse("/users/:id");
/// assert_eq!(tokens[0], Token::Literal("/users".to_string()));
/// assert!(matches!(&tokens[1], Token::Capture(key) if key.name == KeyName::from("id")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Plain text matched verbatim
    Literal(String),
    /// Parameter capture
    Capture(Key),
}

impl Token {
    /// Returns the capture key, if this token is one
    pub fn key(&self) -> Option<&Key> {
        match self {
            Token::Capture(key) => Some(key),
            Token::Literal(_) => None,
        }
    }
}

/// Parses a pattern string into tokens (pure function)
///
/// Literal text between recognized captures is coalesced into a single
/// `Token::Literal`. Unnamed captures receive increasing indices starting at 0.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::pattern::{parse, KeyName};
///
/// let tokens = parse("/files/(.*)/:rev?");
/// let names: Vec<_> = tokens.iter().filter_map(|t| t.key()).map(|k| k.name.clone()).collect();
/// assert_eq!(names, vec![KeyName::Index(0), KeyName::from("rev")]);
/// ```
pub fn parse(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut next_index = 0usize;
    let mut offset = 0usize;

    for caps in PATH_TOKEN.captures_iter(pattern) {
        let Some(whole) = caps.get(0) else { continue };
        literal.push_str(&pattern[offset..whole.start()]);
        offset = whole.end();

        // `\x` keeps `x` as plain text
        if let Some(escaped) = caps.get(1) {
            literal.push_str(&escaped.as_str()[1..]);
            continue;
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        let prefix = caps.get(2).map(|m| m.as_str());
        let custom = caps.get(4).or_else(|| caps.get(5)).map(|m| m.as_str());
        let modifier = caps.get(6).map(|m| m.as_str());
        let asterisk = caps.get(7).is_some();

        let delimiter = prefix.unwrap_or("/");
        let sub_pattern = match custom {
            Some(custom) => custom.to_string(),
            None if asterisk => ".*".to_string(),
            None => format!("[^{}]+?", regex::escape(delimiter)),
        };

        let name = match caps.get(3) {
            Some(name) => KeyName::Named(name.as_str().to_string()),
            None => {
                next_index += 1;
                KeyName::Index(next_index - 1)
            }
        };

        tokens.push(Token::Capture(Key {
            name,
            prefix: prefix.unwrap_or_default().to_string(),
            delimiter: delimiter.to_string(),
            optional: matches!(modifier, Some("?") | Some("*")),
            repeat: matches!(modifier, Some("+") | Some("*")),
            pattern: escape_group(&sub_pattern),
            asterisk,
        }));
    }

    literal.push_str(&pattern[offset..]);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    tokens
}

/// Escapes a custom sub-pattern for embedding inside a capture group
///
/// The tokenizer already rejects bare parentheses, so the only remaining
/// hazard is an unescaped `$` anchoring the middle of the expression.
fn escape_group(group: &str) -> String {
    let mut escaped = String::with_capacity(group.len());
    let mut after_backslash = false;

    for c in group.chars() {
        if !after_backslash && c == '$' {
            escaped.push('\\');
        }
        after_backslash = !after_backslash && c == '\\';
        escaped.push(c);
    }

    escaped
}
