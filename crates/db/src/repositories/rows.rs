//! Column decoding shared by the SQL repositories.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Decode, Row, Sqlite, Type};

use super::RepositoryError;

pub(super) fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(super) fn timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(super) fn optional_timestamp(
    value: Option<String>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|raw| timestamp(&raw, column)).transpose()
}

pub(super) fn date(value: &str, column: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(super) fn parsed<T>(value: &str, column: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = String>,
{
    value.parse::<T>().map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(super) fn encode_list(values: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(values).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(super) fn decode_list(value: &str, column: &str) -> Result<Vec<String>, RepositoryError> {
    serde_json::from_str(value).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::{date, decode_list, encode_list, timestamp};

    #[test]
    fn list_columns_are_json_text() {
        let encoded = encode_list(&["detailing".to_string(), "sampling".to_string()])
            .expect("encode");
        assert_eq!(encoded, r#"["detailing","sampling"]"#);
        assert_eq!(decode_list(&encoded, "activities").expect("decode").len(), 2);
        assert!(decode_list("not json", "activities").is_err());
    }

    #[test]
    fn malformed_timestamps_are_decode_errors() {
        assert!(timestamp("2025-01-10T09:00:00Z", "created_at").is_ok());
        assert!(timestamp("yesterday", "created_at").is_err());
        assert!(date("2025-13-01", "plan_date").is_err());
    }
}
