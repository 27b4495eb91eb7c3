//! Route: one compiled pattern and the middleware built on it

use std::collections::HashMap;
use std::rc::Rc;

use crate::decode::{decode_capture, decode_pathname};
use crate::dispatch::{handler, Middleware};
use crate::error::PatternError;
use crate::pattern::{compile, Key, PathSpec, Pattern, PatternOptions};

/// Per-route matching options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Case-sensitive matching
    pub sensitive: bool,
    /// No optional trailing `/`
    pub strict: bool,
}

/// A registered pattern
///
/// The catch-all `*` is compiled as `(.*)`, so its capture lands under key `0`.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::{Route, RouteOptions};
/// use std::collections::HashMap;
///
/// let route = Route::new("/user/:id", RouteOptions::default()).unwrap();
/// let mut params = HashMap::new();
///
/// assert!(route.matches("/user/42?tab=posts", &mut params, true));
/// assert_eq!(params["id"], "42");
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    pattern: Pattern,
}

impl Route {
    /// Compiles `spec` with `options`
    pub fn new(spec: impl Into<PathSpec>, options: RouteOptions) -> Result<Self, PatternError> {
        let spec = spec.into();
        let spec = if spec.is_wildcard() {
            PathSpec::Literal("(.*)".to_string())
        } else {
            spec
        };

        let pattern = compile(
            &spec,
            &PatternOptions {
                sensitive: options.sensitive,
                strict: options.strict,
                end: true,
            },
        )?;

        Ok(Self {
            path: spec.to_string(),
            pattern,
        })
    }

    /// Pattern source as compiled
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn keys(&self) -> &[Key] {
        self.pattern.keys()
    }

    /// Matches a logical path and writes captures into `params`
    ///
    /// The query string is ignored. The pathname is percent-decoded before
    /// matching (an encoded `/` stays encoded) and each capture is finished
    /// with [`decode_capture`] before it is stored; `decode` turns on the
    /// `+`-as-space policy. Captures that did not participate leave any
    /// existing value in `params` alone.
    pub fn matches(&self, path: &str, params: &mut HashMap<String, String>, decode: bool) -> bool {
        let pathname = path.split('?').next().unwrap_or_default();
        let decoded = decode_pathname(pathname);

        let Some(found) = self.pattern.exec(&decoded) else {
            return false;
        };

        for (key, value) in found.captures {
            if let Some(value) = value {
                params.insert(
                    key.to_string(),
                    decode_capture(&value, decode).into_owned(),
                );
            }
        }

        true
    }

    /// Wraps `inner` so it only runs when this route matches the context
    ///
    /// On a miss the continuation is called right away.
    pub fn middleware(self: &Rc<Self>, inner: Middleware) -> Middleware {
        let route = Rc::clone(self);
        handler(move |ctx, next| {
            let path = ctx.path();
            let decode = ctx.decode_components();
            let matched = ctx.with_params(|params| route.matches(&path, params, decode));

            if matched {
                ctx.mark_matched(route.path());
                inner(ctx, next)
            } else {
                next.call()?;
                Ok(())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn route(pattern: &str) -> Route {
        Route::new(pattern, RouteOptions::default()).unwrap()
    }

    #[rstest]
    #[case("/about", "/about", true)]
    #[case("/about", "/about/", true)]
    #[case("/about", "/about?x=1", true)]
    #[case("/about", "/About", true)]
    #[case("/about", "/about/team", false)]
    #[case("*", "/anything/at/all", true)]
    fn test_matches(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
        let mut params = HashMap::new();
        assert_eq!(route(pattern).matches(path, &mut params, true), expected);
    }

    #[test]
    fn test_wildcard_captures_whole_path() {
        let wildcard = route("*");
        assert_eq!(wildcard.path(), "(.*)");

        let mut params = HashMap::new();
        assert!(wildcard.matches("/a/b", &mut params, true));
        assert_eq!(params["0"], "/a/b");
    }

    #[test]
    fn test_strict_route() {
        let strict = Route::new(
            "/about",
            RouteOptions {
                strict: true,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        let mut params = HashMap::new();
        assert!(strict.matches("/about", &mut params, true));
        assert!(!strict.matches("/about/", &mut params, true));
    }

    #[test]
    fn test_absent_capture_keeps_existing_value() {
        let mut params = HashMap::from([("id".to_string(), "outer".to_string())]);
        assert!(route("/posts/:id?").matches("/posts", &mut params, true));
        assert_eq!(params["id"], "outer");

        assert!(route("/posts/:id?").matches("/posts/9", &mut params, true));
        assert_eq!(params["id"], "9");
    }

    #[test]
    fn test_captures_are_decoded() {
        let mut params = HashMap::new();
        assert!(route("/user/:id").matches("/user/a%2Fb", &mut params, true));
        assert_eq!(params["id"], "a/b");

        assert!(route("/tag/:name").matches("/tag/caf%C3%A9+au+lait", &mut params, true));
        assert_eq!(params["name"], "café au lait");
    }

    #[rstest]
    #[case("/c++", "/c%2B%2B")]
    #[case("/100%", "/100%25")]
    #[case("/café", "/caf%C3%A9")]
    fn test_literal_route_matches_encoded_url(#[case] pattern: &str, #[case] path: &str) {
        let mut params = HashMap::new();
        assert!(route(pattern).matches(path, &mut params, true));
    }

    #[test]
    fn test_capture_is_not_decoded_twice() {
        let mut params = HashMap::new();
        assert!(route("/tag/:name").matches("/tag/100%252F", &mut params, true));
        assert_eq!(params["name"], "100%2F");

        assert!(route("/tag/:name").matches("/tag/c%2B%2B", &mut params, false));
        assert_eq!(params["name"], "c++");
    }

    #[test]
    fn test_capture_decoding_can_be_disabled() {
        let mut params = HashMap::new();
        assert!(route("/tag/:name").matches("/tag/a+b", &mut params, false));
        assert_eq!(params["name"], "a+b");
    }
}
