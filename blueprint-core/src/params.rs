use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single directive parameter: `key=value` or `key=[a,b,c]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(s) => Some(s),
            ParamValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            ParamValue::Scalar(_) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

/// Parameter map handed to template fragments.
///
/// The accessors follow the conventions the built-in templates rely on:
/// an empty scalar counts as "not given" so the template falls back to its
/// default, and a scalar passed where a list is expected is a one-item list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<ParamValue>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Non-empty scalar value for `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(ParamValue::as_scalar)
            .filter(|s| !s.is_empty())
    }

    /// Scalar value for `key`, or `default` when absent or empty.
    pub fn text_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.text(key).unwrap_or(default)
    }

    /// List value for `key`. A non-empty scalar becomes a single item.
    pub fn items(&self, key: &str) -> Option<Vec<&str>> {
        match self.get(key)? {
            ParamValue::List(items) => Some(items.iter().map(String::as_str).collect()),
            ParamValue::Scalar(s) if !s.is_empty() => Some(vec![s.as_str()]),
            ParamValue::Scalar(_) => None,
        }
    }

    /// Scalar parsed as a non-negative integer.
    pub fn number(&self, key: &str) -> Option<usize> {
        self.text(key).and_then(|s| s.trim().parse().ok())
    }

    /// Scalar read as a flag. Only `false`, `no`, `off` and `0` are false.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.text(key).map(|s| {
            !matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "false" | "no" | "off" | "0"
            )
        })
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Params(iter.into_iter().collect())
    }
}

/// Parameters a component actually renders with.
///
/// Seeds `theme` from the enclosing blueprint, then lays the component's own
/// parameters over it. Nothing else cascades.
pub fn cascade(blueprint: &Params, component: &Params) -> Params {
    let mut merged = Params::new();
    if let Some(theme) = blueprint.get("theme") {
        merged.insert("theme", theme.clone());
    }
    for (key, value) in component.iter() {
        merged.insert(key, value.clone());
    }
    merged
}
