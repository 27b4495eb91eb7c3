/// Percent-decoding policies for paths, query strings and captured params
///
/// All functions are **pure** and return `Cow::Borrowed` when there is nothing
/// to decode. Malformed input never fails: the raw text is kept as-is.

use std::borrow::Cow;

use tracing::debug;

/// Decodes a percent-encoded component, falling back to the raw text
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::decode::decode_component;
/// use std::borrow::Cow;
///
/// assert_eq!(decode_component("caf%C3%A9"), "café");
/// assert!(matches!(decode_component("/plain"), Cow::Borrowed("/plain")));
///
/// // Not valid UTF-8 once decoded: kept raw
/// assert_eq!(decode_component("%E0%A4%A"), "%E0%A4%A");
/// ```
pub fn decode_component(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }

    match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(error) => {
            debug!(raw, %error, "malformed percent-encoding, keeping raw value");
            Cow::Borrowed(raw)
        }
    }
}

/// Controller decoding policy for query strings, hashes and param values
///
/// When enabled, `+` is read as a space before percent-decoding.
/// When disabled, the value is returned untouched.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::decode::decode_url_component;
///
/// assert_eq!(decode_url_component("a+b%21", true), "a b!");
/// assert_eq!(decode_url_component("a+b%21", false), "a+b%21");
/// ```
pub fn decode_url_component(raw: &str, enabled: bool) -> Cow<'_, str> {
    if !enabled || !(raw.contains('%') || raw.contains('+')) {
        return Cow::Borrowed(raw);
    }

    let spaced = raw.replace('+', " ");
    Cow::Owned(decode_component(&spaced).into_owned())
}

/// Decodes a pathname for matching while keeping encoded separators opaque
///
/// `%2F` (an encoded `/`) stays encoded so that a decoded segment never
/// introduces a new separator. A `%25` directly followed by `2F` also stays
/// encoded, otherwise it would decode into text that reads as `%2F`.
/// Everything else is decoded, so `/c%2B%2B` becomes `/c++` and `/100%25`
/// becomes `/100%`. Captured values are finished by [`decode_capture`].
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::decode::decode_pathname;
///
/// assert_eq!(decode_pathname("/caf%C3%A9/a%2Fb"), "/café/a%2Fb");
/// assert_eq!(decode_pathname("/100%25"), "/100%");
/// assert_eq!(decode_pathname("/100%252F"), "/100%252F");
/// ```
pub fn decode_pathname(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }

    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(index) = find_opaque_escape(rest) {
        decoded.push_str(&decode_component(&rest[..index]));
        decoded.push_str(&rest[index..index + 3]);
        rest = &rest[index + 3..];
    }
    decoded.push_str(&decode_component(rest));

    Cow::Owned(decoded)
}

/// Finishes decoding a value captured from a [`decode_pathname`] result
///
/// Expands the escapes `decode_pathname` left in place and nothing else, so
/// no part of the value is decoded twice. With `plus_as_space`, a `+` is read
/// as a space.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::decode::decode_capture;
///
/// assert_eq!(decode_capture("a%2Fb", true), "a/b");
/// assert_eq!(decode_capture("100%252F", true), "100%2F");
/// assert_eq!(decode_capture("100%", true), "100%");
/// assert_eq!(decode_capture("a+b", true), "a b");
/// assert_eq!(decode_capture("a+b", false), "a+b");
/// ```
pub fn decode_capture(raw: &str, plus_as_space: bool) -> Cow<'_, str> {
    let spaced = plus_as_space && raw.contains('+');
    if !spaced && find_opaque_escape(raw).is_none() {
        return Cow::Borrowed(raw);
    }

    let push = |out: &mut String, text: &str| {
        if plus_as_space {
            out.push_str(&text.replace('+', " "));
        } else {
            out.push_str(text);
        }
    };

    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(index) = find_opaque_escape(rest) {
        push(&mut decoded, &rest[..index]);
        // `%25` is only opaque in front of `2F`, which stays as text
        decoded.push(if rest[index..].starts_with("%25") { '%' } else { '/' });
        rest = &rest[index + 3..];
    }
    push(&mut decoded, rest);

    Cow::Owned(decoded)
}

/// Byte offset of the first `%2F`, or of a `%25` followed by `2F` (either case)
fn find_opaque_escape(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| {
        matches!(
            &bytes[i..],
            [b'%', b'2', b'F' | b'f', ..] | [b'%', b'2', b'5', b'2', b'F' | b'f', ..]
        )
    })
}

/// Percent-encodes a value for use as a path segment
pub fn encode_component(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}
