//! Time axis values for raster groups.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One entry of a dataset's time axis.
///
/// The catalog sends either plain indices (datasets without date metadata)
/// or date labels such as `"20160708"` or `"20160708_20160801"` for
/// interferogram-style pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum XValue {
    Index(i64),
    Number(f64),
    Label(String),
}

impl XValue {
    /// Calendar date for this entry, if it carries one.
    ///
    /// For a date pair the secondary (later) date is used.
    pub fn date(&self) -> Option<NaiveDate> {
        let XValue::Label(label) = self else {
            return None;
        };
        let part = match label.split_once('_') {
            Some((_, secondary)) => secondary,
            None => label.as_str(),
        };
        parse_date(part.trim())
    }
}

impl std::fmt::Display for XValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XValue::Index(i) => write!(f, "{}", i),
            XValue::Number(n) => write!(f, "{}", n),
            XValue::Label(s) => write!(f, "{}", s),
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    ["%Y%m%d", "%Y-%m-%d", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            // Full timestamps: keep only the date part.
            s.get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_date_label() {
        let x = XValue::Label("20160708".to_string());
        assert_eq!(x.date(), NaiveDate::from_ymd_opt(2016, 7, 8));
    }

    #[test]
    fn test_pair_uses_secondary_date() {
        let x = XValue::Label("20160708_20160801".to_string());
        assert_eq!(x.date(), NaiveDate::from_ymd_opt(2016, 8, 1));
    }

    #[test]
    fn test_iso_timestamp() {
        let x = XValue::Label("2024-01-15T12:00:00Z".to_string());
        assert_eq!(x.date(), NaiveDate::from_ymd_opt(2024, 1, 15));
    }

    #[test]
    fn test_index_has_no_date() {
        assert_eq!(XValue::Index(3).date(), None);
        assert_eq!(XValue::Index(3).to_string(), "3");
    }

    #[test]
    fn test_untagged_deserialization() {
        let v: Vec<XValue> = serde_json::from_str(r#"[0, 1.5, "20200101"]"#).unwrap();
        assert_eq!(v[0], XValue::Index(0));
        assert_eq!(v[1], XValue::Number(1.5));
        assert_eq!(v[2], XValue::Label("20200101".to_string()));
    }
}
