use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Date-only formats accepted during cell normalization, tried in order.
///
/// The US form is tried before the day-first form, so an input like
/// `03/04/2025` resolves to March 4. This is the documented lossy side of
/// best-effort normalization, not a defect.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Datetime formats accepted during cell normalization, tried in order.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A scalar cell value in a sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
    String(String),
}

impl CellValue {
    /// Check if the value is empty
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The numeric reading of the value, if it has one.
    ///
    /// Only `Int` and `Float` count as numeric; booleans, dates and
    /// numeric-looking strings do not. Aggregations rely on this to skip
    /// non-numeric cells.
    #[must_use]
    pub fn numeric(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Render the value as a plain string (empty for `Null`)
    #[must_use]
    pub fn as_str(&self) -> String {
        self.to_string()
    }

    /// Normalize a raw edit into a typed value.
    ///
    /// An explicit ordered chain of parse attempts: empty input stays
    /// empty, an unambiguous `true`/`false` stays boolean, then date
    /// formats, then integer, then float, falling back to text. Ambiguous
    /// strings (a ZIP code, a version number) may be misclassified as
    /// numbers; that is accepted lossy behavior.
    #[must_use]
    pub fn normalize(raw: &str) -> CellValue {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return CellValue::Null;
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "true" => return CellValue::Bool(true),
            "false" => return CellValue::Bool(false),
            _ => {}
        }

        if let Some(dt) = parse_date(trimmed) {
            return CellValue::Date(dt);
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Int(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            return CellValue::Float(f);
        }

        CellValue::String(raw.to_string())
    }
}

/// Try the accepted datetime formats, then the date-only formats.
fn parse_date(s: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(fl) => write!(f, "{fl}"),
            CellValue::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            CellValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i64::from(i))
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::Date(dt)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_normalize_null() {
        assert_eq!(CellValue::normalize(""), CellValue::Null);
        assert_eq!(CellValue::normalize("   "), CellValue::Null);
    }

    #[test]
    fn test_normalize_bool() {
        assert_eq!(CellValue::normalize("true"), CellValue::Bool(true));
        assert_eq!(CellValue::normalize("FALSE"), CellValue::Bool(false));
        // "yes"/"no" are ambiguous; they stay text
        assert_eq!(
            CellValue::normalize("yes"),
            CellValue::String("yes".to_string())
        );
    }

    #[test]
    fn test_normalize_date_before_number() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(CellValue::normalize("2025-03-14"), CellValue::Date(expected));
        assert_eq!(CellValue::normalize("03/14/2025"), CellValue::Date(expected));
        // day-first fallback when the US form cannot apply
        assert_eq!(CellValue::normalize("14/03/2025"), CellValue::Date(expected));
    }

    #[test]
    fn test_normalize_datetime() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(
            CellValue::normalize("2025-03-14 09:30:00"),
            CellValue::Date(expected)
        );
        assert_eq!(
            CellValue::normalize("2025-03-14T09:30:00"),
            CellValue::Date(expected)
        );
    }

    #[test]
    fn test_normalize_numbers() {
        assert_eq!(CellValue::normalize("42"), CellValue::Int(42));
        assert_eq!(CellValue::normalize("-7"), CellValue::Int(-7));
        assert_eq!(CellValue::normalize("2.5"), CellValue::Float(2.5));
        assert_eq!(CellValue::normalize("1e3"), CellValue::Float(1000.0));
    }

    #[test]
    fn test_normalize_text_fallback() {
        assert_eq!(
            CellValue::normalize("n/a"),
            CellValue::String("n/a".to_string())
        );
        // a numeric-looking ZIP code parses as a number
        assert_eq!(CellValue::normalize("02139"), CellValue::Int(2139));
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["42", "2.5", "true", "2025-03-14", "hello", "", "n/a"] {
            let once = CellValue::normalize(raw);
            let twice = CellValue::normalize(&once.as_str());
            assert_eq!(once, twice, "normalization of {raw:?} not idempotent");
        }
    }

    #[test]
    fn test_renormalize_exponent_drifts_variant_not_value() {
        // "1e3" stores as a float; its rendering re-reads as an integer.
        // The numeric reading is stable even though the variant is not.
        let once = CellValue::normalize("1e3");
        assert_eq!(once, CellValue::Float(1000.0));

        let again = CellValue::normalize(&once.as_str());
        assert_eq!(again, CellValue::Int(1000));
        assert_eq!(once.numeric(), again.numeric());
    }

    #[test]
    fn test_numeric() {
        assert_eq!(CellValue::Int(3).numeric(), Some(3.0));
        assert_eq!(CellValue::Float(2.5).numeric(), Some(2.5));
        assert_eq!(CellValue::Bool(true).numeric(), None);
        assert_eq!(CellValue::String("42".to_string()).numeric(), None);
        assert_eq!(CellValue::Null.numeric(), None);
    }

    #[test]
    fn test_serialize_untagged() {
        let row = vec![
            CellValue::Null,
            CellValue::Bool(true),
            CellValue::Int(3),
            CellValue::Float(2.5),
            CellValue::from("x"),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,true,3,2.5,"x"]"#);

        let d = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let json = serde_json::to_string(&CellValue::Date(d)).unwrap();
        assert_eq!(json, r#""2025-03-14T09:30:00""#);
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Int(5).to_string(), "5");
        let d = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(CellValue::Date(d).to_string(), "2025-01-02");
    }
}
