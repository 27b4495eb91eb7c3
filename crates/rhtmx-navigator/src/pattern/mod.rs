//! Route pattern compiler
//!
//! Turns an express-style pattern (`/users/:id`), a list of patterns, or a
//! prebuilt [`Regex`] into a [`Pattern`]: one anchored expression that
//! recognizes paths, plus the ordered [`Key`]s needed to name its captures and
//! (for single string patterns) rebuild a path from parameters.
//!
//! ## Pattern Syntax
//!
//! | Syntax          | Meaning                                           |
//! |-----------------|---------------------------------------------------|
//! | `/:id`          | named capture, one segment                        |
//! | `/:id?`         | optional capture (prefix and value jointly)       |
//! | `/:path+`       | one or more segments                              |
//! | `/:path*`       | zero or more segments                             |
//! | `/:id(\d+)`     | capture with a custom sub-pattern                 |
//! | `/(\d+)`        | unnamed capture, keyed by position                |
//! | `/*`            | unnamed greedy wildcard                           |
//! | `\:`            | escaped, matched literally                        |
//!
//! ## Trailing Slash Policy
//!
//! In non-strict mode (the default) one trailing `/` is optional, so `/a/b`
//! and `/a/b/` are the same route. Strict mode drops that allowance.
//!
//! ## Example
//!
//! ```
//! use rhtmx_navigator::pattern::{compile, PathParams, PatternOptions};
//!
//! let pattern = compile(&"/user/:id".into(), &PatternOptions::default()).unwrap();
//! assert!(pattern.is_match("/user/42/"));
//!
//! let found = pattern.exec("/user/42").unwrap();
//! assert_eq!(found.get("id"), Some("42"));
//!
//! let path = pattern.to_path(&PathParams::new().with("id", "7")).unwrap();
//! assert_eq!(path, "/user/7");
//! ```

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fmt;

use crate::error::PatternError;

pub mod builder;
pub mod token;

pub use builder::{ParamValue, PathParams};
pub use token::{parse, Key, KeyName, Token};

/// Upper bound for compiled expressions (bytes)
const MAX_EXPRESSION_SIZE: usize = 1 << 20;

/// Matching options for a compiled pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    /// Case-sensitive matching (default: false)
    pub sensitive: bool,
    /// Disallow the optional trailing separator (default: false)
    pub strict: bool,
    /// Anchor at the end of the input (default: true)
    pub end: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            sensitive: false,
            strict: false,
            end: true,
        }
    }
}

/// Input accepted by the compiler
///
/// Resolved once at registration time; matching never re-inspects the input shape.
#[derive(Debug, Clone)]
pub enum PathSpec {
    /// A single pattern string
    Literal(String),
    /// Several pattern strings OR-combined into one expression
    List(Vec<String>),
    /// A prebuilt expression; its capturing groups become positional keys
    Expression(Regex),
}

impl PathSpec {
    /// Whether this is the catch-all sentinel `*`
    pub fn is_wildcard(&self) -> bool {
        matches!(self, PathSpec::Literal(text) if text == "*")
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpec::Literal(text) => f.write_str(text),
            PathSpec::List(items) => write!(f, "{}", items.join(",")),
            PathSpec::Expression(regex) => f.write_str(regex.as_str()),
        }
    }
}

impl From<&str> for PathSpec {
    fn from(text: &str) -> Self {
        PathSpec::Literal(text.to_string())
    }
}

impl From<String> for PathSpec {
    fn from(text: String) -> Self {
        PathSpec::Literal(text)
    }
}

impl From<Vec<String>> for PathSpec {
    fn from(items: Vec<String>) -> Self {
        PathSpec::List(items)
    }
}

impl From<Vec<&str>> for PathSpec {
    fn from(items: Vec<&str>) -> Self {
        PathSpec::List(items.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PathSpec {
    fn from(items: &[&str]) -> Self {
        PathSpec::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathSpec {
    fn from(items: [&str; N]) -> Self {
        PathSpec::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Regex> for PathSpec {
    fn from(regex: Regex) -> Self {
        PathSpec::Expression(regex)
    }
}

/// A compiled route pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Human-readable source (the pattern string, list or expression)
    source: String,
    /// Anchored matching expression
    regex: Regex,
    /// One key per capturing group, in group order
    keys: Vec<Key>,
    /// Parsed tokens; only single string patterns keep them
    tokens: Option<Vec<Token>>,
    /// Per-token value validators for reverse building, aligned with `tokens`
    matchers: Vec<Option<Regex>>,
}

/// Result of a successful [`Pattern::exec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Text matched by the whole expression
    pub matched: String,
    /// Captured values paired with their keys; `None` for groups that did not participate
    pub captures: Vec<(KeyName, Option<String>)>,
}

impl PatternMatch {
    /// Value captured under `name` (named key or positional index rendered as text)
    ///
    /// List entries can reuse a key, so the first key that captured wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures.iter().find_map(|(key, value)| {
            (key.to_string() == name)
                .then_some(value.as_deref())
                .flatten()
        })
    }

    /// All defined captures as a name → value map
    pub fn params(&self) -> HashMap<String, String> {
        self.captures
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
            .collect()
    }
}

/// Compiles a pattern input into a [`Pattern`]
///
/// - `Literal` is tokenized and assembled into one anchored expression.
/// - `List` compiles each entry independently and joins them as alternatives;
///   all entries share one key list in declaration order.
/// - `Expression` is used as given; each capturing group becomes a positional key.
pub fn compile(spec: &PathSpec, options: &PatternOptions) -> Result<Pattern, PatternError> {
    match spec {
        PathSpec::Literal(text) => Pattern::from_tokens(text, parse(text), options),
        PathSpec::List(items) => {
            let (parts, keys) = items.iter().fold(
                (Vec::new(), Vec::new()),
                |(mut parts, mut keys), item| {
                    let tokens = parse(item);
                    parts.push(tokens_to_source(&tokens, options));
                    keys.extend(tokens.into_iter().filter_map(|token| match token {
                        Token::Capture(key) => Some(key),
                        Token::Literal(_) => None,
                    }));
                    (parts, keys)
                },
            );

            let source = format!("(?:{})", parts.join("|"));
            Ok(Pattern {
                source: spec.to_string(),
                regex: build_expression(&source, options.sensitive)?,
                keys,
                tokens: None,
                matchers: Vec::new(),
            })
        }
        PathSpec::Expression(regex) => Ok(Pattern {
            source: regex.as_str().to_string(),
            regex: regex.clone(),
            keys: (0..regex.captures_len().saturating_sub(1))
                .map(Key::positional)
                .collect(),
            tokens: None,
            matchers: Vec::new(),
        }),
    }
}

/// Assembles parsed tokens into an anchored expression source (pure function)
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::pattern::{parse, tokens_to_source, PatternOptions};
///
/// let source = tokens_to_source(&parse("/a/:b"), &PatternOptions::default());
/// assert_eq!(source, "^/a/([^/]+?)/?$");
/// ```
pub fn tokens_to_source(tokens: &[Token], options: &PatternOptions) -> String {
    let ends_with_slash = matches!(tokens.last(), Some(Token::Literal(text)) if text.ends_with('/'));
    let last = tokens.len().saturating_sub(1);

    let mut route = tokens
        .iter()
        .enumerate()
        .fold(String::from("^"), |mut route, (index, token)| {
            match token {
                Token::Literal(text) => {
                    // Folded into the optional trailing separator below
                    let text = if !options.strict && ends_with_slash && index == last {
                        &text[..text.len() - 1]
                    } else {
                        text.as_str()
                    };
                    route.push_str(&regex::escape(text));
                }
                Token::Capture(key) => route.push_str(&capture_source(key)),
            }
            route
        });

    match (options.end, options.strict) {
        (true, false) => route.push_str("/?$"),
        (true, true) => route.push('$'),
        (false, true) if ends_with_slash => {}
        (false, _) => route.push_str("(?:/|$)"),
    }

    route
}

/// Assembles parsed tokens and compiles the result into a [`Regex`]
///
/// # Errors
///
/// [`PatternError::InvalidExpression`] when a custom sub-pattern is not a valid expression.
pub fn tokens_to_regex(tokens: &[Token], options: &PatternOptions) -> Result<Regex, PatternError> {
    build_expression(&tokens_to_source(tokens, options), options.sensitive)
}

/// Expression fragment for one capture, honoring its prefix and modifiers
fn capture_source(key: &Key) -> String {
    let prefix = regex::escape(&key.prefix);
    let capture = if key.repeat {
        format!("(?:{pattern})(?:{prefix}(?:{pattern}))*", pattern = key.pattern)
    } else {
        key.pattern.clone()
    };

    match (key.optional, prefix.is_empty()) {
        (true, false) => format!("(?:{prefix}({capture}))?"),
        (true, true) => format!("({capture})?"),
        (false, _) => format!("{prefix}({capture})"),
    }
}

fn build_expression(source: &str, sensitive: bool) -> Result<Regex, PatternError> {
    RegexBuilder::new(source)
        .case_insensitive(!sensitive)
        .size_limit(MAX_EXPRESSION_SIZE)
        .build()
        .map_err(|error| PatternError::InvalidExpression {
            source_text: source.to_string(),
            error,
        })
}

impl Pattern {
    fn from_tokens(
        text: &str,
        tokens: Vec<Token>,
        options: &PatternOptions,
    ) -> Result<Self, PatternError> {
        let regex = tokens_to_regex(&tokens, options)?;

        let matchers = tokens
            .iter()
            .map(|token| {
                token
                    .key()
                    .map(|key| build_expression(&format!("^(?:{})$", key.pattern), true))
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let keys = tokens.iter().filter_map(Token::key).cloned().collect();

        Ok(Self {
            source: text.to_string(),
            regex,
            keys,
            tokens: Some(tokens),
            matchers,
        })
    }

    /// The pattern as written at registration
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled matching expression
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Capture keys in group order
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Parsed tokens, for patterns compiled from a single string
    pub fn tokens(&self) -> Option<&[Token]> {
        self.tokens.as_deref()
    }

    /// Whether `path` matches
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and pairs each capture with its key
    pub fn exec(&self, path: &str) -> Option<PatternMatch> {
        let caps = self.regex.captures(path)?;
        let matched = caps.get(0)?.as_str().to_string();

        let captures = self
            .keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                (
                    key.name.clone(),
                    caps.get(index + 1).map(|m| m.as_str().to_string()),
                )
            })
            .collect();

        Some(PatternMatch { matched, captures })
    }
}
