//! Path template compilation.
//!
//! # Responsibilities
//! - Canonicalize a template (leading slash, no trailing slash unless root)
//! - Locate `{name}` / `{name:pattern}` placeholders at brace depth zero
//! - Build one anchored regex with a capture group per placeholder
//! - Extract placeholder values from a concrete path, left to right
//! - Rebuild a concrete path from values (named-route URL building)

use std::sync::Arc;

use regex::Regex;

/// Pattern used for placeholders without an explicit one.
pub const DEFAULT_PLACEHOLDER_PATTERN: &str = "[^/]+";

/// Error raised while compiling a path template.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("unbalanced braces in {0:?}")]
    UnbalancedBraces(String),

    #[error("missing name or pattern in {0:?}")]
    MissingNameOrPattern(String),

    #[error("route {0} contains capture groups in its regexp")]
    CaptureGroups(String),

    #[error("invalid pattern {pattern:?}: {message}")]
    Regex { pattern: String, message: String },
}

/// Error raised while building a URL from a compiled pattern.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("expected {expected} values, got {got}")]
    ValueCount { expected: usize, got: usize },

    #[error("value {value:?} for {name} does not match {pattern}")]
    InvalidValue {
        name: String,
        value: String,
        pattern: String,
    },
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// Canonicalized template.
    template: String,
    /// Anchored matcher over the whole path.
    regex: Regex,
    /// Literal pieces around the placeholders; one more than `names`.
    literals: Vec<String>,
    /// Placeholder names in declaration order.
    names: Arc<[String]>,
    /// Per-placeholder anchored validators.
    validators: Vec<Regex>,
}

impl PathPattern {
    /// Compile a path template.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let path = canonicalize(template);
        let spans = brace_spans(&path)?;

        let mut pattern = String::with_capacity(path.len() + 16);
        pattern.push('^');
        let mut literals = Vec::with_capacity(spans.len() + 1);
        let mut names = Vec::with_capacity(spans.len());
        let mut validators = Vec::with_capacity(spans.len());

        let mut end = 0;
        for (i, &(open, close)) in spans.iter().enumerate() {
            let raw = &path[end..open];
            end = close;

            let inner = &path[open + 1..close - 1];
            let (name, patt) = match inner.split_once(':') {
                Some((name, patt)) => (name, patt),
                None => (inner, DEFAULT_PLACEHOLDER_PATTERN),
            };
            if name.is_empty() || patt.is_empty() {
                return Err(PatternError::MissingNameOrPattern(path[open..close].to_string()));
            }

            pattern.push_str(&regex::escape(raw));
            pattern.push_str(&format!("(?P<v{i}>{patt})"));

            literals.push(raw.to_string());
            names.push(name.to_string());
            validators.push(compile_regex(&format!("^(?:{patt})$"))?);
        }

        let raw = &path[end..];
        pattern.push_str(&regex::escape(raw));
        pattern.push('$');
        literals.push(raw.to_string());

        let regex = compile_regex(&pattern)?;

        // Group 0 is the whole match.
        if regex.captures_len() - 1 != names.len() {
            return Err(PatternError::CaptureGroups(path));
        }

        Ok(Self {
            template: path,
            regex,
            literals,
            names: names.into(),
            validators,
        })
    }

    /// The canonicalized template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Shared handle to the placeholder names, for per-request contexts.
    pub fn shared_names(&self) -> Arc<[String]> {
        Arc::clone(&self.names)
    }

    /// Per-placeholder validators, aligned with [`names`](Self::names).
    pub fn validators(&self) -> &[Regex] {
        &self.validators
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extract placeholder values from `path`, aligned with the declared names.
    /// Returns `None` when the path does not match.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        Some(
            (1..=self.names.len())
                .map(|i| caps.get(i).map_or("", |m| m.as_str()).to_string())
                .collect(),
        )
    }

    /// Substitute `values` into the template, checking each one against its
    /// placeholder pattern.
    pub fn build<S: AsRef<str>>(&self, values: &[S]) -> Result<String, BuildError> {
        if values.len() != self.names.len() {
            return Err(BuildError::ValueCount {
                expected: self.names.len(),
                got: values.len(),
            });
        }

        let mut out = String::with_capacity(self.template.len());
        for (i, value) in values.iter().enumerate() {
            let value = value.as_ref();
            if !self.validators[i].is_match(value) {
                return Err(BuildError::InvalidValue {
                    name: self.names[i].clone(),
                    value: value.to_string(),
                    pattern: self.validators[i].as_str().to_string(),
                });
            }
            out.push_str(&self.literals[i]);
            out.push_str(value);
        }
        out.push_str(&self.literals[self.names.len()]);
        Ok(out)
    }
}

/// Strip one trailing slash (except for the root) and force a leading slash.
fn canonicalize(template: &str) -> String {
    let trimmed = template.strip_suffix('/').unwrap_or(template);
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Byte spans `(open, close_exclusive)` of every top-level `{...}` pair.
fn brace_spans(s: &str) -> Result<Vec<(usize, usize)>, PatternError> {
    let mut level: i32 = 0;
    let mut start = 0;
    let mut spans = Vec::new();

    for (i, b) in s.bytes().enumerate() {
        match b {
            b'{' => {
                level += 1;
                if level == 1 {
                    start = i;
                }
            }
            b'}' => {
                level -= 1;
                if level == 0 {
                    spans.push((start, i + 1));
                } else if level < 0 {
                    return Err(PatternError::UnbalancedBraces(s.to_string()));
                }
            }
            _ => {}
        }
    }

    if level != 0 {
        return Err(PatternError::UnbalancedBraces(s.to_string()));
    }
    Ok(spans)
}

fn compile_regex(pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|e| PatternError::Regex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}
