//! Query-string composition for the monitoring API.
//!
//! Parameters keep insertion order; absent and empty values are dropped so the
//! backend applies its own defaults.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes escaped in keys and values: everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Absent,
}

impl QueryValue {
    fn render(&self) -> Option<String> {
        match self {
            QueryValue::Text(s) if s.is_empty() => None,
            QueryValue::Text(s) => Some(s.clone()),
            QueryValue::Integer(n) => Some(n.to_string()),
            QueryValue::Float(n) => Some(n.to_string()),
            QueryValue::Absent => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Text(value.clone())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Integer(i64::from(value))
    }
}

impl From<usize> for QueryValue {
    fn from(value: usize) -> Self {
        QueryValue::Integer(value as i64)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(QueryValue::Absent)
    }
}

/// Ordered set of query parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, QueryValue)>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    /// Returns `?k=v&...`, or an empty string when every value is empty.
    /// Spaces become `%20`, never `+`.
    pub fn build(&self) -> String {
        let pairs: Vec<String> = self
            .params
            .iter()
            .filter_map(|(key, value)| {
                value.render().map(|rendered| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(key, COMPONENT),
                        utf8_percent_encode(&rendered, COMPONENT)
                    )
                })
            })
            .collect();
        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join("&"))
        }
    }
}

/// Shorthand for one-off queries built from `(key, value)` pairs.
pub fn build_query<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<QueryValue>,
{
    params
        .into_iter()
        .fold(QueryBuilder::new(), |builder, (key, value)| {
            builder.param(key.as_ref(), value)
        })
        .build()
}
