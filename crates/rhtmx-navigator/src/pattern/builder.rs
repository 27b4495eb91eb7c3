/// Reverse compilation: building a path from a pattern and parameters
///
/// Walks the same token sequence the matcher was built from. Every capture
/// value is percent-encoded and checked against the token's own sub-pattern;
/// any mismatch is a [`PatternError`], never a silently dropped segment.

use std::collections::HashMap;

use super::{Key, Pattern, Token};
use crate::decode::encode_component;
use crate::error::PatternError;

/// Value supplied for one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A single segment value
    Single(String),
    /// Ordered values for a repeating (`+`/`*`) capture
    Repeated(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Repeated(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Repeated(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(values: [&str; N]) -> Self {
        ParamValue::Repeated(values.iter().map(|s| s.to_string()).collect())
    }
}

/// Parameters for [`Pattern::to_path`], keyed by capture name
///
/// Positional captures are addressed by their index rendered as text (`"0"`).
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::pattern::PathParams;
///
/// let params = PathParams::new()
///     .with("id", "42")
///     .with("tags", vec!["a", "b"]);
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: HashMap<String, ParamValue>,
}

impl PathParams {
    /// Creates an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds or replaces a value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Looks up a value
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Number of supplied values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values were supplied
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, String>> for PathParams {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            values: map
                .into_iter()
                .map(|(name, value)| (name, ParamValue::Single(value)))
                .collect(),
        }
    }
}

impl Pattern {
    /// Builds a path by substituting `params` into this pattern
    ///
    /// # Errors
    ///
    /// - [`PatternError::MissingParameter`] when a required capture has no value
    /// - [`PatternError::UnexpectedRepeat`] when a list is given to a non-repeating capture
    /// - [`PatternError::EmptyRepeat`] when an empty list is given to a required repeating capture
    /// - [`PatternError::InvalidValue`] when an encoded value fails the capture's sub-pattern
    /// - [`PatternError::NotReversible`] for list and prebuilt-expression patterns
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::pattern::{compile, PathParams, PatternOptions};
    ///
    /// let pattern = compile(&"/a/:x+".into(), &PatternOptions::default()).unwrap();
    /// let path = pattern.to_path(&PathParams::new().with("x", vec!["1", "2"])).unwrap();
    /// assert_eq!(path, "/a/1/2");
    ///
    /// assert!(pattern.to_path(&PathParams::new().with("x", Vec::<&str>::new())).is_err());
    /// ```
    pub fn to_path(&self, params: &PathParams) -> Result<String, PatternError> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| PatternError::NotReversible(self.source.clone()))?;

        tokens
            .iter()
            .zip(self.matchers.iter())
            .try_fold(String::new(), |mut path, (token, matcher)| {
                match (token, matcher) {
                    (Token::Literal(text), _) => path.push_str(text),
                    (Token::Capture(key), Some(matcher)) => {
                        path.push_str(&build_segment(key, matcher, params)?)
                    }
                    // Matchers are built for every capture at compile time
                    (Token::Capture(key), None) => {
                        return Err(PatternError::NotReversible(key.name.to_string()))
                    }
                }
                Ok(path)
            })
    }
}

/// Renders one capture (prefix included), or nothing for an absent optional capture
fn build_segment(
    key: &Key,
    matcher: &regex::Regex,
    params: &PathParams,
) -> Result<String, PatternError> {
    let name = key.name.to_string();

    let encode_checked = |value: &str| -> Result<String, PatternError> {
        let segment = if key.asterisk {
            encode_wildcard(value)
        } else {
            encode_component(value).into_owned()
        };
        if matcher.is_match(&segment) {
            Ok(segment)
        } else {
            Err(PatternError::InvalidValue {
                name: key.name.to_string(),
                pattern: key.pattern.clone(),
                value: segment,
            })
        }
    };

    match params.get(&name) {
        None if key.optional => Ok(String::new()),
        None => Err(PatternError::MissingParameter { name }),
        Some(ParamValue::Single(value)) => {
            Ok(format!("{}{}", key.prefix, encode_checked(value.as_str())?))
        }
        Some(ParamValue::Repeated(values)) if !key.repeat => Err(PatternError::UnexpectedRepeat {
            name,
            count: values.len(),
        }),
        Some(ParamValue::Repeated(values)) if values.is_empty() => {
            if key.optional {
                Ok(String::new())
            } else {
                Err(PatternError::EmptyRepeat { name })
            }
        }
        Some(ParamValue::Repeated(values)) => {
            values
                .iter()
                .enumerate()
                .try_fold(String::new(), |mut out, (index, value)| {
                    out.push_str(if index == 0 { &key.prefix } else { &key.delimiter });
                    out.push_str(&encode_checked(value.as_str())?);
                    Ok(out)
                })
        }
    }
}

/// Encodes each `/`-separated piece of a wildcard value, keeping the `/`
fn encode_wildcard(value: &str) -> String {
    value
        .split('/')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/")
}
