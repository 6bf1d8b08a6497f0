//! Parses `select <fields> from <topic> [where …] [limit N] [with …]`
//! (§4.5) into an AST the planner compiles into a predicate + projection +
//! restrictions.

use crate::error::{Error, Result};
use crate::scan::KqlRestrictions;

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Fields(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum Comparison {
    Eq,
    Contains,
}

#[derive(Debug, Clone)]
pub struct WhereClause {
    pub field: String,
    pub comparison: Comparison,
    pub literal: String,
}

#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub projection: Projection,
    pub topic: String,
    pub where_clauses: Vec<WhereClause>,
    pub limit: Option<usize>,
    pub restrictions: KqlRestrictions,
    pub decoder: Option<String>,
}

/// Split `line` into whitespace-separated words, keeping single- or
/// double-quoted runs intact (quotes stripped, escapes honored by the
/// caller via `codec::unescape`).
fn words(line: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else { break };
        if first == '\'' || first == '"' {
            let quote = first;
            chars.next();
            let mut word = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        word.push('\\');
                        word.push(escaped);
                    }
                } else if c == quote {
                    closed = true;
                    break;
                } else {
                    word.push(c);
                }
            }
            if !closed {
                return Err(Error::InvalidArgs("select".to_string(), "unterminated quote".to_string()));
            }
            out.push(crate::codec::unescape(&word));
        } else {
            let mut word = String::new();
            while matches!(chars.peek(), Some(c) if !c.is_whitespace()) {
                word.push(chars.next().unwrap());
            }
            out.push(word);
        }
    }
    Ok(out)
}

pub fn parse(line: &str) -> Result<SelectStatement> {
    let tokens = words(line)?;
    let mut idx = 0;
    let next = |idx: &mut usize| -> Option<String> {
        let tok = tokens.get(*idx).cloned();
        if tok.is_some() {
            *idx += 1;
        }
        tok
    };

    let select_kw = next(&mut idx).ok_or_else(invalid_select)?;
    if !select_kw.eq_ignore_ascii_case("select") {
        return Err(invalid_select());
    }

    let mut field_tokens = Vec::new();
    loop {
        match tokens.get(idx) {
            Some(t) if t.eq_ignore_ascii_case("from") => break,
            Some(t) => {
                field_tokens.push(t.clone());
                idx += 1;
            }
            None => return Err(invalid_select()),
        }
    }
    let projection = parse_projection(&field_tokens.join(" "));

    idx += 1; // consume "from"
    let topic = next(&mut idx).ok_or_else(invalid_select)?;

    let mut where_clauses = Vec::new();
    let mut limit = None;
    let mut restrictions = KqlRestrictions::none();
    let mut decoder = None;

    while idx < tokens.len() {
        let keyword = tokens[idx].to_ascii_lowercase();
        match keyword.as_str() {
            "where" => {
                idx += 1;
                where_clauses.extend(parse_where_clause_body("select", &tokens, &mut idx)?);
            }
            "limit" => {
                idx += 1;
                let n = next(&mut idx).ok_or_else(invalid_select)?;
                limit = Some(
                    n.parse::<usize>()
                        .map_err(|_| Error::InvalidArgs("select".to_string(), format!("bad limit: {n}")))?,
                );
            }
            "with" => {
                idx += 1;
                loop {
                    let Some(tok) = tokens.get(idx) else { break };
                    if tok.eq_ignore_ascii_case("limit") || tok.eq_ignore_ascii_case("where") {
                        break;
                    }
                    for pair in tok.split(',') {
                        let Some((key, value)) = pair.split_once('=') else {
                            return Err(invalid_select());
                        };
                        match key {
                            "groupId" | "group_id" => restrictions.group_id = Some(value.to_string()),
                            "delta" => {
                                restrictions.delta = Some(value.parse().map_err(|_| {
                                    Error::InvalidArgs("select".to_string(), format!("bad delta: {value}"))
                                })?)
                            }
                            "decoder" => decoder = Some(value.to_string()),
                            other => {
                                return Err(Error::InvalidArgs(
                                    "select".to_string(),
                                    format!("unknown restriction: {other}"),
                                ))
                            }
                        }
                    }
                    idx += 1;
                }
            }
            _ => return Err(invalid_select()),
        }
    }

    Ok(SelectStatement {
        projection,
        topic,
        where_clauses,
        limit,
        restrictions,
        decoder,
    })
}

/// The `field op literal [and ...]` grammar `select`'s `where` keyword
/// introduces (§4.5): one or more comparisons, AND-combined. `idx` is
/// advanced past everything consumed. Shared with `parse_where_clauses`
/// below so other commands (`count`) can filter by the same grammar
/// without going through the full `select` statement.
fn parse_where_clause_body(cmd: &str, tokens: &[String], idx: &mut usize) -> Result<Vec<WhereClause>> {
    let mut where_clauses = Vec::new();
    loop {
        let field = tokens.get(*idx).cloned().ok_or_else(|| invalid_where(cmd))?;
        *idx += 1;
        let op_tok = tokens.get(*idx).cloned().ok_or_else(|| invalid_where(cmd))?;
        *idx += 1;
        let comparison = match op_tok.as_str() {
            "=" | "==" => Comparison::Eq,
            "contains" | "~" => Comparison::Contains,
            _ => return Err(invalid_where(cmd)),
        };
        let literal = tokens.get(*idx).cloned().ok_or_else(|| invalid_where(cmd))?;
        *idx += 1;
        where_clauses.push(WhereClause { field, comparison, literal });
        match tokens.get(*idx).map(|s| s.to_ascii_lowercase()) {
            Some(t) if t == "and" => {
                *idx += 1;
                continue;
            }
            _ => break,
        }
    }
    Ok(where_clauses)
}

/// Parse a standalone `where field op literal [and ...]` tail — the same
/// grammar `select` compiles, reused by `count <topic> [where …]` (§6's CLI
/// table) so the two commands share one predicate language instead of
/// `count` narrowing to a single flat equality. `tail` is already
/// word-split and quote-stripped (the command tokenizer's `Token::text`).
/// An empty tail yields no clauses, matching every message.
pub fn parse_where_clauses(cmd: &str, tail: &[String]) -> Result<Vec<WhereClause>> {
    if tail.is_empty() {
        return Ok(Vec::new());
    }
    if !tail[0].eq_ignore_ascii_case("where") {
        return Err(invalid_where(cmd));
    }
    let mut idx = 1;
    parse_where_clause_body(cmd, tail, &mut idx)
}

fn invalid_where(cmd: &str) -> Error {
    Error::InvalidArgs(cmd.to_string(), "where <field> <=|==|contains|~> <literal> [and ...]".to_string())
}

fn parse_projection(fields: &str) -> Projection {
    if fields.trim() == "*" {
        Projection::All
    } else {
        Projection::Fields(
            fields
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
        )
    }
}

fn invalid_select() -> Error {
    Error::InvalidArgs("select".to_string(), "select <fields> from <topic> [where …] [limit N] [with …]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_select() {
        let stmt = parse("select * from t").unwrap();
        assert_eq!(stmt.projection, Projection::All);
        assert_eq!(stmt.topic, "t");
        assert!(stmt.where_clauses.is_empty());
    }

    #[test]
    fn parses_projection_where_and_limit() {
        let stmt = parse("select key,value from t where value = 'b' limit 10").unwrap();
        assert_eq!(stmt.projection, Projection::Fields(vec!["key".to_string(), "value".to_string()]));
        assert_eq!(stmt.topic, "t");
        assert_eq!(stmt.limit, Some(10));
        assert_eq!(stmt.where_clauses.len(), 1);
        assert_eq!(stmt.where_clauses[0].field, "value");
        assert_eq!(stmt.where_clauses[0].literal, "b");
    }

    #[test]
    fn parses_with_restrictions() {
        let stmt = parse("select * from t with groupId=g1,delta=5").unwrap();
        assert_eq!(stmt.restrictions.group_id, Some("g1".to_string()));
        assert_eq!(stmt.restrictions.delta, Some(5));
    }

    #[test]
    fn missing_from_is_invalid_args() {
        assert!(matches!(parse("select * t"), Err(Error::InvalidArgs(_, _))));
    }
}
