//! Row mapping for `Dao::get` / `Dao::select`.

use std::fmt;

use sqlx::any::AnyRow;
use sqlx::{Any, Column, Decode, Row, Type};
use thiserror::Error;

/// A destination type rows are mapped into.
///
/// `COLUMNS` lists every column the type accepts. A strict DAO rejects a
/// result set carrying any column not named here; a DAO returned by
/// `unsafe_mapping` ignores extras.
pub trait Record: Sized + Send + Unpin + 'static {
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error>;

    fn check_columns(names: &[&str]) -> Result<(), ColumnMismatch> {
        match names.iter().find(|name| !Self::COLUMNS.contains(name)) {
            Some(column) => Err(ColumnMismatch::new::<Self>(column)),
            None => Ok(()),
        }
    }
}

/// A result column with no destination in the record type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing destination name {column} in {record}")]
pub struct ColumnMismatch {
    pub column: String,
    pub record: &'static str,
}

impl ColumnMismatch {
    pub fn new<T>(column: &str) -> Self {
        Self {
            column: column.to_string(),
            record: std::any::type_name::<T>(),
        }
    }
}

/// `get` found more than one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected exactly one row, found more")]
pub struct TooManyRows;

/// Single-column result, read by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scalar<T>(pub T);

impl<T> Scalar<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: fmt::Display> fmt::Display for Scalar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> Record for Scalar<T>
where
    T: for<'r> Decode<'r, Any> + Type<Any> + Send + Unpin + 'static,
{
    const COLUMNS: &'static [&'static str] = &[];

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        row.try_get::<T, _>(0).map(Scalar)
    }

    fn check_columns(names: &[&str]) -> Result<(), ColumnMismatch> {
        match names {
            [_] => Ok(()),
            [_, extra, ..] => Err(ColumnMismatch::new::<Self>(extra)),
            [] => Err(ColumnMismatch::new::<Self>("<none>")),
        }
    }
}

/// Column names of `row`, in result order.
pub(crate) fn column_names(row: &AnyRow) -> Vec<&str> {
    row.columns().iter().map(|column| column.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note;

    impl Record for Note {
        const COLUMNS: &'static [&'static str] = &["id", "body"];

        fn from_row(_row: &AnyRow) -> Result<Self, sqlx::Error> {
            Ok(Note)
        }
    }

    #[test]
    fn subset_of_declared_columns_is_accepted() {
        assert!(Note::check_columns(&["id"]).is_ok());
        assert!(Note::check_columns(&["body", "id"]).is_ok());
    }

    #[test]
    fn undeclared_column_is_named_in_the_error() {
        let err = Note::check_columns(&["id", "created_at"]).unwrap_err();
        assert_eq!(err.column, "created_at");
        assert!(err.to_string().starts_with("missing destination name created_at in "));
    }

    #[test]
    fn scalar_needs_exactly_one_column() {
        assert!(Scalar::<i64>::check_columns(&["count"]).is_ok());
        assert_eq!(
            Scalar::<i64>::check_columns(&["a", "b"]).unwrap_err().column,
            "b"
        );
        assert!(Scalar::<i64>::check_columns(&[]).is_err());
    }
}
