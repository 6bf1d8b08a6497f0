//! Display adapter (§4.9.1, Design Notes "dynamic dispatch by string").
//!
//! Command handlers and the query planner return this tagged variant
//! instead of a trait object or `dyn Any`; the REPL's result handler
//! matches on it to print. One constructor per external-library surface
//! the shell touches (ZK `Stat`, scan-engine rows, codec bytes) converts
//! that surface's native type into a `DisplayValue` at the point the
//! handler returns.

use crate::query::SelectRow;
use crate::zk::StatFields;

#[derive(Debug, Clone)]
pub enum DisplayValue {
    Unit,
    Text(String),
    Count(usize),
    Rows(Vec<SelectRow>),
    Listing(Vec<String>),
    Stat(StatFields),
    Json(serde_json::Value),
}

impl DisplayValue {
    /// Render as a single line suitable for a non-interactive one-shot
    /// invocation or a plain-text REPL echo. Rich rendering (tables, ANSI
    /// colors) belongs to the out-of-scope pretty printer (§1); this is the
    /// minimal fallback the core ships so the shell is usable standalone.
    pub fn render(&self) -> String {
        match self {
            DisplayValue::Unit => String::new(),
            DisplayValue::Text(s) => s.clone(),
            DisplayValue::Count(n) => n.to_string(),
            DisplayValue::Rows(rows) => rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
            DisplayValue::Listing(items) => items.join("\n"),
            DisplayValue::Stat(stat) => format!(
                "czxid={} mzxid={} version={} dataLength={} numChildren={}",
                stat.czxid, stat.mzxid, stat.version, stat.data_length, stat.num_children
            ),
            DisplayValue::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rows_as_key_value_lines() {
        let rows = vec![vec![("key".to_string(), "k".to_string()), ("value".to_string(), "v".to_string())]];
        assert_eq!(DisplayValue::Rows(rows).render(), "key=k value=v");
    }

    #[test]
    fn renders_count_as_plain_number() {
        assert_eq!(DisplayValue::Count(3).render(), "3");
    }
}
