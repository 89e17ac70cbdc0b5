//! Policy file line format and its compiled form.
//!
//! One JSON object per line:
//! `{"name": "...", "users": ["..."], "actions": ["..."], "readonly": false}`.
//! Missing fields take their zero value and unknown fields are ignored; a line
//! that is not UTF-8 or has the wrong JSON shape is a [`PolicyLineError`].

use regex::Regex;
use serde::Deserialize;

/// Raw policy as written in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicySpec {
    pub name: String,
    pub users: Vec<String>,
    pub actions: Vec<String>,
    pub readonly: bool,
}

impl PolicySpec {
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, PolicyLineError> {
        serde_json::from_str(line).map_err(|e| PolicyLineError {
            line_no,
            line: line.to_string(),
            source: LineFault::Json(e),
        })
    }

    /// Like [`PolicySpec::parse_line`] for a raw line straight from the file.
    pub fn parse_bytes(line: &[u8], line_no: usize) -> Result<Self, PolicyLineError> {
        match std::str::from_utf8(line) {
            Ok(text) => Self::parse_line(text, line_no),
            Err(e) => Err(PolicyLineError {
                line_no,
                line: String::from_utf8_lossy(line).into_owned(),
                source: LineFault::Utf8(e),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LineFault {
    #[error("not valid UTF-8: {0}")]
    Utf8(std::str::Utf8Error),
    #[error(transparent)]
    Json(serde_json::Error),
}

/// A policy line that could not be parsed. The line is skipped, the load
/// continues.
#[derive(Debug, thiserror::Error)]
#[error("policy line {line_no}: {source}")]
pub struct PolicyLineError {
    pub line_no: usize,
    /// Lossy copy for logging.
    pub line: String,
    #[source]
    pub source: LineFault,
}

/// Action pattern compiled once at load time.
///
/// Matching is unanchored: the pattern only has to occur somewhere in the
/// action, so `container` matches `container_start`.
#[derive(Debug, Clone)]
pub enum ActionMatcher {
    Compiled(Regex),
    /// Kept in place so evaluation order is unchanged.
    Invalid { pattern: String, error: String },
}

impl ActionMatcher {
    pub fn compile(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => ActionMatcher::Compiled(re),
            Err(e) => ActionMatcher::Invalid {
                pattern: pattern.to_string(),
                error: e.to_string(),
            },
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            ActionMatcher::Compiled(re) => re.as_str(),
            ActionMatcher::Invalid { pattern, .. } => pattern,
        }
    }

    /// `Err` carries the compile error of an invalid pattern.
    pub fn matches(&self, action: &str) -> Result<bool, &str> {
        match self {
            ActionMatcher::Compiled(re) => Ok(re.is_match(action)),
            ActionMatcher::Invalid { error, .. } => Err(error),
        }
    }
}

/// Immutable policy as held by a snapshot.
#[derive(Debug, Clone)]
pub struct Policy {
    pub name: String,
    /// Source order. `""` matches every principal.
    pub users: Vec<String>,
    /// Source order.
    pub actions: Vec<ActionMatcher>,
    pub readonly: bool,
}

impl Policy {
    pub fn compile(spec: PolicySpec) -> Self {
        let actions = spec.actions.iter().map(|p| ActionMatcher::compile(p)).collect();
        Self {
            name: spec.name,
            users: spec.users,
            actions,
            readonly: spec.readonly,
        }
    }

    /// True if `user` is listed or the policy carries the wildcard entry.
    pub fn applies_to(&self, user: &str) -> bool {
        self.users.iter().any(|u| u.is_empty() || u == user)
    }

    pub fn invalid_patterns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.actions.iter().filter_map(|m| match m {
            ActionMatcher::Invalid { pattern, error } => Some((pattern.as_str(), error.as_str())),
            ActionMatcher::Compiled(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parse_full_line() {
        let spec = PolicySpec::parse_line(
            r#"{"name":"ops","users":["alice","bob"],"actions":["container_.*"],"readonly":true}"#,
            1,
        )
        .unwrap();
        assert_eq!(spec.name, "ops");
        assert_eq!(spec.users, vec!["alice", "bob"]);
        assert_eq!(spec.actions, vec!["container_.*"]);
        assert!(spec.readonly);
    }

    #[test]
    fn missing_fields_default_and_unknown_fields_ignored() {
        let spec = PolicySpec::parse_line(r#"{"name":"bare","comment":"x"}"#, 3).unwrap();
        assert_eq!(spec, PolicySpec { name: "bare".into(), ..PolicySpec::default() });
    }

    #[test]
    fn wrong_shape_reports_line_number() {
        let err = PolicySpec::parse_line(r#"{"name":"x","users":"alice"}"#, 7).unwrap_err();
        assert_eq!(err.line_no, 7);
        assert!(err.to_string().starts_with("policy line 7:"));
        assert!(PolicySpec::parse_line("not json", 1).is_err());
    }

    #[test]
    fn non_utf8_line_is_a_line_error() {
        let err = PolicySpec::parse_bytes(b"{\"name\":\"bad\xff\"}", 4).unwrap_err();
        assert_eq!(err.line_no, 4);
        assert!(matches!(err.source, LineFault::Utf8(_)));
        assert!(err.line.contains("bad"));

        let spec = PolicySpec::parse_bytes(br#"{"name":"ok"}"#, 5).unwrap();
        assert_eq!(spec.name, "ok");
    }

    #[test]
    fn whitespace_only_line_is_a_line_error() {
        let err = PolicySpec::parse_line("   ", 2).unwrap_err();
        assert!(matches!(err.source, LineFault::Json(_)));
    }

    #[test]
    fn action_match_is_substring() {
        let m = ActionMatcher::compile("container");
        assert_eq!(m.matches("container_start"), Ok(true));
        assert_eq!(m.matches("image_list"), Ok(false));
        assert_eq!(ActionMatcher::compile("^image_list$").matches("image_list"), Ok(true));
    }

    #[test]
    fn invalid_pattern_is_kept_with_its_error() {
        let m = ActionMatcher::compile("container_(");
        assert_eq!(m.pattern(), "container_(");
        assert!(m.matches("container_start").is_err());
    }

    #[test]
    fn wildcard_user_applies_to_everyone() {
        let p = Policy::compile(PolicySpec { users: vec![String::new()], ..PolicySpec::default() });
        assert!(p.applies_to("anyone"));
        assert!(p.applies_to(""));

        let p = Policy::compile(PolicySpec { users: vec!["alice".into()], ..PolicySpec::default() });
        assert!(p.applies_to("alice"));
        assert!(!p.applies_to("Alice"));
    }
}
