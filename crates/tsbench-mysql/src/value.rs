//! Conversions between workload record fields and `mysql_async::Value`.

use crate::error::MySqlStoreError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use mysql_async::Value;

/// DATETIME(6) parameter.
pub fn datetime_to_value(dt: &DateTime<Utc>) -> Value {
    Value::Date(
        dt.year() as u16,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
        dt.nanosecond() / 1000, // MySQL uses microseconds
    )
}

/// Read back a DATETIME column, sent either binary or as text.
pub fn datetime_from_value(
    value: &Value,
    table: &'static str,
    column: &'static str,
) -> Result<DateTime<Utc>, MySqlStoreError> {
    let invalid = |reason: String| MySqlStoreError::InvalidValue {
        table,
        column,
        reason,
    };

    match value {
        Value::Date(year, month, day, hour, min, sec, micro) => {
            let naive = NaiveDateTime::new(
                NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                    .ok_or_else(|| invalid(format!("{value:?}")))?,
                NaiveTime::from_hms_micro_opt(*hour as u32, *min as u32, *sec as u32, *micro)
                    .ok_or_else(|| invalid(format!("{value:?}")))?,
            );
            Ok(Utc.from_utc_datetime(&naive))
        }
        Value::Bytes(b) => {
            let s = String::from_utf8_lossy(b);
            NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                .map(|naive| Utc.from_utc_datetime(&naive))
                .map_err(|e| invalid(format!("{s}: {e}")))
        }
        other => Err(invalid(format!("unexpected {other:?}"))),
    }
}

pub fn optional_id(id: Option<i64>) -> Value {
    id.map(Value::Int).unwrap_or(Value::NULL)
}

pub fn text(s: &str) -> Value {
    Value::Bytes(s.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_round_trip_keeps_microseconds() {
        let dt = Utc
            .with_ymd_and_hms(2024, 6, 15, 10, 30, 45)
            .unwrap()
            .with_nanosecond(123_456_000)
            .unwrap();

        let value = datetime_to_value(&dt);
        assert_eq!(value, Value::Date(2024, 6, 15, 10, 30, 45, 123_456));
        assert_eq!(datetime_from_value(&value, "events", "created_at").unwrap(), dt);
    }

    #[test]
    fn test_datetime_from_text() {
        let value = Value::Bytes(b"2023-01-02 03:04:05.000006".to_vec());
        let dt = datetime_from_value(&value, "events", "created_at").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.nanosecond(), 6_000);
    }

    #[test]
    fn test_datetime_rejects_other_values() {
        let err = datetime_from_value(&Value::Int(1), "users", "created_at").unwrap_err();
        assert!(err.to_string().contains("users.created_at"));
    }

    #[test]
    fn test_optional_id() {
        assert_eq!(optional_id(None), Value::NULL);
        assert_eq!(optional_id(Some(3)), Value::Int(3));
    }
}
