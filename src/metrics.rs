use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metric fragments are an open set of keys; only some are read by scoring.
pub type MetricMap = BTreeMap<String, MetricValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Map(MetricMap),
}

impl MetricValue {
    /// Cell text from HTML/CSV feeds: numeric when it parses as one, text otherwise.
    pub fn from_cell(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() || s == "-" || s == "--" {
            return None;
        }
        match parse_number(s) {
            Some(v) => Some(MetricValue::Number(v)),
            None => Some(MetricValue::Text(s.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) if v.is_finite() => Some(*v),
            MetricValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MetricMap> {
        match self {
            MetricValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<MetricMap> for MetricValue {
    fn from(v: MetricMap) -> Self {
        MetricValue::Map(v)
    }
}

/// Deep merge of `source` into `target`.
///
/// Keys present in both where both values are maps are merged recursively;
/// anything else in `source` overwrites. Keys only in `target` are kept.
pub fn merge(target: &mut MetricMap, source: &MetricMap) {
    for (key, incoming) in source {
        match incoming {
            MetricValue::Map(nested) => match target.get_mut(key) {
                Some(MetricValue::Map(existing)) => merge(existing, nested),
                _ => {
                    target.insert(key.clone(), incoming.clone());
                }
            },
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Owned variant of [`merge`] for fragments that are not reused.
pub fn merge_owned(target: &mut MetricMap, source: MetricMap) {
    for (key, incoming) in source {
        match incoming {
            MetricValue::Map(nested) => match target.get_mut(&key) {
                Some(MetricValue::Map(existing)) => merge_owned(existing, nested),
                _ => {
                    target.insert(key, MetricValue::Map(nested));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Walks `path` through nested maps and returns the leaf.
pub fn lookup<'a>(map: &'a MetricMap, path: &[&str]) -> Option<&'a MetricValue> {
    let (last, parents) = path.split_last()?;
    let mut cur = map;
    for key in parents {
        cur = cur.get(*key)?.as_map()?;
    }
    cur.get(*last)
}

pub fn lookup_f64(map: &MetricMap, path: &[&str]) -> Option<f64> {
    lookup(map, path).and_then(MetricValue::as_f64)
}

/// Builds `{a: {b: {.. leaf}}}` from a key path.
pub fn nest(path: &[&str], leaf: MetricValue) -> MetricMap {
    let mut value = leaf;
    for key in path.iter().skip(1).rev() {
        let mut wrapper = MetricMap::new();
        wrapper.insert((*key).to_string(), value);
        value = MetricValue::Map(wrapper);
    }
    let mut out = MetricMap::new();
    if let Some(first) = path.first() {
        out.insert((*first).to_string(), value);
    }
    out
}

fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches('%').replace(',', "");
    let s = s.strip_prefix('+').unwrap_or(&s);
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
