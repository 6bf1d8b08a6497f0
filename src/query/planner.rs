//! Compiles a `SelectStatement` into predicates + projection + restrictions
//! and dispatches to the scan engine's `findMany` (§4.5).

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::kafka::types::{Broker, MessageData};
use crate::scan::predicate::{KeyEquals, Predicate, PredicateList, ValueContains, ValueEquals};
use crate::scan::{engine, CancelFlag, KqlRestrictions};
use crate::zk::ZkView;

use super::decoder::{self, RecordDecoder};
use super::parser::{Comparison, Projection, SelectStatement, WhereClause};

/// Matches a field decoded from a record's value via a `RecordDecoder`
/// against a literal, pending a §9 seam for a richer JSON-path comparison.
struct DecodedFieldEquals {
    field: String,
    literal: String,
    decoder: Arc<dyn RecordDecoder>,
    contains: bool,
}

impl Predicate for DecodedFieldEquals {
    fn satisfies(&self, value: &[u8], _key: &[u8]) -> bool {
        let Ok(record) = self.decoder.decode(value) else {
            return false;
        };
        let Some(field_value) = record.get(&self.field) else {
            return false;
        };
        let text = match field_value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if self.contains {
            text.contains(&self.literal)
        } else {
            text == self.literal
        }
    }
}

/// Compile `where`-clause comparisons into scan-engine predicates. Shared by
/// `select` (via `run_select`) and `count` (§6's CLI table), so both commands
/// filter by the same `field op literal [and ...]` grammar (§4.5).
pub(crate) fn compile_where(
    clauses: &[WhereClause],
    decoder: Option<Arc<dyn RecordDecoder>>,
) -> Result<PredicateList> {
    let mut predicates: Vec<Box<dyn Predicate>> = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let contains = matches!(clause.comparison, Comparison::Contains);
        match clause.field.as_str() {
            "value" if contains => predicates.push(Box::new(ValueContains(clause.literal.clone().into_bytes()))),
            "value" => predicates.push(Box::new(ValueEquals(clause.literal.clone().into_bytes()))),
            "key" if contains => {
                return Err(Error::InvalidArgs(
                    "select".to_string(),
                    "key does not support 'contains'".to_string(),
                ))
            }
            "key" => predicates.push(Box::new(KeyEquals(clause.literal.clone().into_bytes()))),
            field => {
                let Some(decoder) = decoder.clone() else {
                    return Err(Error::InvalidArgs(
                        "select".to_string(),
                        format!("field '{field}' requires a 'with decoder=…' clause"),
                    ));
                };
                predicates.push(Box::new(DecodedFieldEquals {
                    field: field.to_string(),
                    literal: clause.literal.clone(),
                    decoder,
                    contains,
                }));
            }
        }
    }
    Ok(PredicateList(predicates))
}

/// A single output row: column name to display text, in projection order.
pub type SelectRow = Vec<(String, String)>;

pub struct SelectResult {
    pub rows: Vec<SelectRow>,
    pub scanned: usize,
}

fn project(msg: &MessageData, projection: &Projection, decoder: Option<&Arc<dyn RecordDecoder>>) -> SelectRow {
    let decoded = decoder.and_then(|d| d.decode(&msg.value).ok());
    let column = |field: &str| -> String {
        match field {
            "partition" => msg.partition.to_string(),
            "offset" => msg.offset.to_string(),
            "key" => String::from_utf8_lossy(&msg.key).to_string(),
            "value" => String::from_utf8_lossy(&msg.value).to_string(),
            other => decoded
                .as_ref()
                .and_then(|r| r.get(other))
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }
    };
    match projection {
        Projection::All => vec![
            ("partition".to_string(), column("partition")),
            ("offset".to_string(), column("offset")),
            ("key".to_string(), column("key")),
            ("value".to_string(), column("value")),
        ],
        Projection::Fields(fields) => fields.iter().map(|f| (f.clone(), column(f))).collect(),
    }
}

/// Compile and run a `SelectStatement` against `topic`, fanning out through
/// the scan engine's `findMany` (§4.4, §4.5).
pub async fn run_select(
    zk: &ZkView,
    seed_brokers: Vec<Broker>,
    statement: &SelectStatement,
    cancel: CancelFlag,
) -> Result<SelectResult> {
    let decoder: Option<Arc<dyn RecordDecoder>> = match &statement.decoder {
        Some(name) => Some(Arc::from(decoder::resolve_decoder(name)?)),
        None => None,
    };
    let predicates = Arc::new(compile_where(&statement.where_clauses, decoder.clone())?);
    let counter = Arc::new(AtomicUsize::new(0));
    let matches = engine::find_many(
        zk,
        &statement.topic,
        seed_brokers,
        predicates,
        statement.restrictions.clone(),
        statement.limit,
        Arc::clone(&counter),
        cancel,
    )
    .await?;

    let rows = matches
        .iter()
        .map(|m| project(m, &statement.projection, decoder.as_ref()))
        .collect();
    Ok(SelectResult { rows, scanned: counter.load(std::sync::atomic::Ordering::Relaxed) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser;

    fn msg(partition: i32, offset: i64, key: &str, value: &str) -> MessageData {
        MessageData {
            partition,
            offset,
            next_offset: offset + 1,
            last_offset: offset + 1,
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
        }
    }

    #[test]
    fn compiles_value_equals_clause() {
        let stmt = parser::parse("select * from t where value = 'b'").unwrap();
        let predicates = compile_where(&stmt.where_clauses, None).unwrap();
        assert!(predicates.matches(b"b", b""));
        assert!(!predicates.matches(b"a", b""));
    }

    #[test]
    fn unknown_field_without_decoder_is_invalid_args() {
        let stmt = parser::parse("select * from t where foo = 'b'").unwrap();
        assert!(matches!(compile_where(&stmt.where_clauses, None), Err(Error::InvalidArgs(_, _))));
    }

    #[test]
    fn projection_reads_requested_columns() {
        let m = msg(0, 1, "k", "b");
        let row = project(&m, &Projection::Fields(vec!["key".to_string(), "value".to_string()]), None);
        assert_eq!(row, vec![("key".to_string(), "k".to_string()), ("value".to_string(), "b".to_string())]);
    }
}
