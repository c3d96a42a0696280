//! Bind parameter values carried by query errors and bound by the data-access layer.

use serde::Serialize;

/// A single positional bind parameter.
///
/// The set of variants is closed: every value must be bindable by
/// the relational driver *and* printable in a structured log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryArg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl QueryArg {
    pub fn is_null(&self) -> bool {
        matches!(self, QueryArg::Null)
    }
}

impl From<bool> for QueryArg {
    fn from(value: bool) -> Self {
        QueryArg::Bool(value)
    }
}

impl From<i32> for QueryArg {
    fn from(value: i32) -> Self {
        QueryArg::Int(i64::from(value))
    }
}

impl From<i64> for QueryArg {
    fn from(value: i64) -> Self {
        QueryArg::Int(value)
    }
}

impl From<u32> for QueryArg {
    fn from(value: u32) -> Self {
        QueryArg::Int(i64::from(value))
    }
}

impl From<f64> for QueryArg {
    fn from(value: f64) -> Self {
        QueryArg::Float(value)
    }
}

impl From<&str> for QueryArg {
    fn from(value: &str) -> Self {
        QueryArg::Text(value.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(value: String) -> Self {
        QueryArg::Text(value)
    }
}

impl From<Vec<u8>> for QueryArg {
    fn from(value: Vec<u8>) -> Self {
        QueryArg::Bytes(value)
    }
}

impl<T> From<Option<T>> for QueryArg
where
    T: Into<QueryArg>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(QueryArg::Null)
    }
}

/// Build a `Vec<QueryArg>` from heterogeneous values.
///
/// ```
/// use groundwork_core::{query_args, QueryArg};
///
/// let args = query_args![1, "two", None::<i64>];
/// assert_eq!(args, vec![QueryArg::Int(1), QueryArg::Text("two".into()), QueryArg::Null]);
/// ```
#[macro_export]
macro_rules! query_args {
    () => {
        ::std::vec::Vec::<$crate::QueryArg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::QueryArg::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_json_values() {
        let args = query_args![7, "x", true, None::<String>, 1.5];
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"[7,"x",true,null,1.5]"#);
    }

    #[test]
    fn option_maps_to_null_or_value() {
        assert!(QueryArg::from(None::<i64>).is_null());
        assert_eq!(QueryArg::from(Some("a")), QueryArg::Text("a".into()));
    }
}
