// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Dotted-path access into platform JSON payloads with typed, non-panicking extraction
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper (typed values, ids, timestamps, arrays)
// invariants: No panics; missing paths and nulls yield None; numeric path segments index arrays
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;

/// Wrapper around a JSON location to allow typed extraction via a clear second step.
pub struct JsonFetched<'a> {
  inner: Option<&'a serde_json::Value>,
}

impl<'a> JsonFetched<'a> {
  /// Attempt to deserialize the fetched value as `T`.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.inner.and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
  }

  /// Deserialize as `T`, returning `T::default()` on failure.
  pub fn to_or_default<T>(&self) -> T
  where
    T: DeserializeOwned + Default,
  {
    self.to::<T>().unwrap_or_default()
  }

  /// Borrow a string value without cloning; empty strings count as absent.
  pub fn str(&self) -> Option<&'a str> {
    self.inner.and_then(|v| v.as_str()).filter(|s| !s.is_empty())
  }

  /// Platform ids are numbers on the code hosts and strings elsewhere.
  pub fn id(&self) -> Option<String> {
    match self.inner? {
      serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
      serde_json::Value::Number(n) => Some(n.to_string()),
      _ => None,
    }
  }

  /// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date taken as midnight UTC.
  pub fn datetime(&self) -> Option<DateTime<Utc>> {
    let raw = self.str()?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
      return Some(dt.with_timezone(&Utc));
    }

    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
      .ok()
      .and_then(|d| d.and_hms_opt(0, 0, 0))
      .map(|ndt| ndt.and_utc())
  }

  /// Elements of an array value; anything else is empty.
  pub fn items(&self) -> &'a [serde_json::Value] {
    self.inner.and_then(|v| v.as_array()).map(|a| a.as_slice()).unwrap_or(&[])
  }

  pub fn value(&self) -> Option<&'a serde_json::Value> {
    self.inner.filter(|v| !v.is_null())
  }
}

/// Extension to fetch nested values via dotted paths like "user.login" or "labels.0.name".
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for serde_json::Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      let next = match cur {
        serde_json::Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => cur.get(key),
      };

      match next {
        Some(n) if !n.is_null() => cur = n,
        _ => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}
