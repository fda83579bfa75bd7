//! Directive parsing.
//!
//! A directive is one trimmed line of blueprint source:
//!
//! ```text
//! form:email; fields=[email,password]; submit="Sign In";
//! ```
//!
//! The text before the first `;` is the base key. Every later segment of the
//! form `key=value` becomes a parameter. Malformed segments never abort the
//! parse; they are reported as [`ParseWarning`]s and the caller decides what
//! to do with them through [`ParseMode`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::params::{ParamValue, Params};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub raw: String,
    pub base_key: String,
    pub params: Params,
}

impl Directive {
    /// Canonical form of the whole line, used for exact registry matches.
    pub fn signature(&self) -> String {
        signature(&self.raw)
    }

    pub fn is_page(&self) -> bool {
        self.base_key.starts_with("page:")
    }

    pub fn is_blueprint(&self) -> bool {
        self.base_key.starts_with("blueprint:")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Keep whatever parsed cleanly, report the rest as warnings.
    #[default]
    Lenient,
    /// Any warning is an error.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// Segment without `=`; skipped.
    MissingEquals { segment: String },
    /// `=value` with nothing before it; skipped.
    EmptyKey { segment: String },
    /// `[` without `]` or the other way round; stored as a plain scalar.
    UnbalancedBracket { key: String, value: String },
    /// A quote on one side only; stored without stripping.
    UnbalancedQuote { key: String, value: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MissingEquals { segment } => {
                write!(f, "segment `{segment}` has no `=` and was skipped")
            }
            ParseWarning::EmptyKey { segment } => {
                write!(f, "segment `{segment}` has an empty key and was skipped")
            }
            ParseWarning::UnbalancedBracket { key, value } => {
                write!(f, "`{key}` has unbalanced brackets in `{value}`; kept as text")
            }
            ParseWarning::UnbalancedQuote { key, value } => {
                write!(f, "`{key}` has an unbalanced quote in `{value}`; kept as written")
            }
        }
    }
}

/// Result of parsing one line: always a directive, possibly with warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub directive: Directive,
    pub warnings: Vec<ParseWarning>,
}

impl ParseOutcome {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_result(self, mode: ParseMode) -> Result<ParseOutcome, ParseError> {
        match mode {
            ParseMode::Strict if !self.warnings.is_empty() => Err(ParseError::Malformed {
                line: self.directive.raw,
                warnings: self.warnings,
            }),
            _ => Ok(self),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed directive `{line}`: {}", join_warnings(.warnings))]
    Malformed {
        line: String,
        warnings: Vec<ParseWarning>,
    },
}

fn join_warnings(warnings: &[ParseWarning]) -> String {
    warnings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Text before the first `;`, trimmed.
pub fn base_key(line: &str) -> &str {
    line.split(';').next().unwrap_or_default().trim()
}

/// Canonical line signature.
///
/// Segments are split on `;`, trimmed, empty segments dropped and the rest
/// re-joined with `"; "`. Parameter order is significant. Registry keys go
/// through the same function, so `separator:text;content="OR"  ;` and
/// `separator:text; content="OR"` name the same entry.
pub fn signature(line: &str) -> String {
    line.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse a single line leniently.
pub fn parse_line(line: &str) -> ParseOutcome {
    let raw = line.trim();
    let mut segments = raw.split(';');
    let base_key = segments.next().unwrap_or_default().trim().to_string();

    let mut params = Params::new();
    let mut warnings = Vec::new();

    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let Some((key, value)) = segment.split_once('=') else {
            warnings.push(ParseWarning::MissingEquals {
                segment: segment.to_string(),
            });
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            warnings.push(ParseWarning::EmptyKey {
                segment: segment.to_string(),
            });
            continue;
        }

        let (value, warning) = parse_value(key, value.trim());
        if let Some(w) = warning {
            warnings.push(w);
        }
        params.insert(key, value);
    }

    ParseOutcome {
        directive: Directive {
            raw: raw.to_string(),
            base_key,
            params,
        },
        warnings,
    }
}

/// Parse a single line under the given mode.
pub fn parse(line: &str, mode: ParseMode) -> Result<ParseOutcome, ParseError> {
    parse_line(line).into_result(mode)
}

fn parse_value(key: &str, value: &str) -> (ParamValue, Option<ParseWarning>) {
    let opens = value.starts_with('[');
    let closes = value.ends_with(']');

    if opens && closes && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        let items = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(|item| item.trim().to_string()).collect()
        };
        return (ParamValue::List(items), None);
    }

    if opens != closes {
        let warning = ParseWarning::UnbalancedBracket {
            key: key.to_string(),
            value: value.to_string(),
        };
        return (ParamValue::Scalar(value.to_string()), Some(warning));
    }

    let bytes = value.as_bytes();
    let quote = |b: u8| b == b'"' || b == b'\'';
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) if bytes.len() >= 2 && quote(first) && first == last => {
            (ParamValue::Scalar(value[1..value.len() - 1].to_string()), None)
        }
        (Some(&first), Some(&last)) if quote(first) || quote(last) => {
            let warning = ParseWarning::UnbalancedQuote {
                key: key.to_string(),
                value: value.to_string(),
            };
            (ParamValue::Scalar(value.to_string()), Some(warning))
        }
        _ => (ParamValue::Scalar(value.to_string()), None),
    }
}
