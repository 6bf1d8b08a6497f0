//! Unix-style argument assembly (C6, §4.6): the first token is the command
//! name; each `-X` marks a flag whose value is the next non-flag token
//! unless the schema declares it bare; remaining tokens are positional.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};

use super::tokenizer::Token;

/// Declares a command's accepted shape so validation can fail with
/// `InvalidArgs` on missing required positionals or unknown flags.
#[derive(Debug, Clone, Default)]
pub struct ParamSchema {
    pub required_positional: Vec<&'static str>,
    pub optional_positional: Vec<&'static str>,
    pub value_flags: &'static [&'static str],
    pub bare_flags: &'static [&'static str],
    /// Once the required positionals are satisfied, keep every remaining
    /// token verbatim (quotes already stripped) in `ParsedArgs::raw_tail`
    /// instead of flag/positional-parsing them. For commands whose tail is
    /// its own sub-grammar, e.g. `count <topic> [where …]` (§4.5's `where`
    /// clause, reused by `src/query/parser.rs::parse_where_clauses`).
    pub allow_trailing_raw: bool,
}

impl ParamSchema {
    pub fn none() -> Self {
        ParamSchema::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub flags: BTreeMap<String, String>,
    pub bare: HashSet<String>,
    /// Backtick-flagged tokens, in order, for commands that care.
    pub shell_tokens: Vec<String>,
    /// Populated only when `ParamSchema::allow_trailing_raw` is set: every
    /// token after the required positionals, verbatim and in order.
    pub raw_tail: Vec<String>,
}

impl ParsedArgs {
    pub fn positional(&self, idx: usize) -> Option<&str> {
        self.positional.get(idx).map(|s| s.as_str())
    }

    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(|s| s.as_str())
    }

    pub fn has_bare(&self, name: &str) -> bool {
        self.bare.contains(name)
    }
}

/// Assemble `tokens` (command name already consumed) per `schema`, for the
/// command named `command_name` (carried in any `InvalidArgs` raised).
pub fn assemble(command_name: &str, tokens: &[Token], schema: &ParamSchema) -> Result<ParsedArgs> {
    let mut out = ParsedArgs::default();
    let mut idx = 0;

    if schema.allow_trailing_raw {
        let needed = schema.required_positional.len();
        while idx < tokens.len() && out.positional.len() < needed {
            match &tokens[idx] {
                Token::Shell(body) => out.shell_tokens.push(body.clone()),
                token => out.positional.push(token.text().to_string()),
            }
            idx += 1;
        }
        if out.positional.len() < needed {
            let missing = &schema.required_positional[out.positional.len()..];
            return Err(invalid_args(
                command_name,
                format!("missing required argument(s): {}", missing.join(", ")),
            ));
        }
        out.raw_tail = tokens[idx..].iter().map(|t| t.text().to_string()).collect();
        return Ok(out);
    }

    while idx < tokens.len() {
        let token = &tokens[idx];
        if let Token::Shell(body) = token {
            out.shell_tokens.push(body.clone());
            idx += 1;
            continue;
        }
        let text = token.text();
        if let Some(flag) = text.strip_prefix('-') {
            if schema.bare_flags.contains(&flag) {
                out.bare.insert(flag.to_string());
                idx += 1;
            } else if schema.value_flags.contains(&flag) {
                let Some(value_token) = tokens.get(idx + 1) else {
                    return Err(invalid_args(command_name, format!("flag -{flag} requires a value")));
                };
                out.flags.insert(flag.to_string(), value_token.text().to_string());
                idx += 2;
            } else {
                return Err(invalid_args(command_name, format!("unknown flag -{flag}")));
            }
        } else {
            out.positional.push(text.to_string());
            idx += 1;
        }
    }

    let min = schema.required_positional.len();
    let max = min + schema.optional_positional.len();
    if out.positional.len() < min {
        let missing = &schema.required_positional[out.positional.len()..];
        return Err(invalid_args(
            command_name,
            format!("missing required argument(s): {}", missing.join(", ")),
        ));
    }
    if out.positional.len() > max && max > 0 {
        return Err(invalid_args(command_name, "too many arguments".to_string()));
    }
    Ok(out)
}

fn invalid_args(command_name: &str, reason: String) -> Error {
    Error::InvalidArgs(command_name.to_string(), reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tokenizer::tokenize;

    fn tail(line: &str) -> Vec<Token> {
        let mut tokens = tokenize(line).unwrap();
        tokens.remove(0);
        tokens
    }

    #[test]
    fn assembles_positional_and_value_flag() {
        let schema = ParamSchema {
            required_positional: vec!["key"],
            value_flags: &["t"],
            ..ParamSchema::none()
        };
        let args = assemble("zget", &tail("zget /a/b -t json"), &schema).unwrap();
        assert_eq!(args.positional, vec!["/a/b".to_string()]);
        assert_eq!(args.flag("t"), Some("json"));
    }

    #[test]
    fn bare_flag_takes_no_value() {
        let schema = ParamSchema {
            required_positional: vec!["key"],
            bare_flags: &["r"],
            ..ParamSchema::none()
        };
        let args = assemble("zrm", &tail("zrm /a/b -r"), &schema).unwrap();
        assert_eq!(args.positional, vec!["/a/b".to_string()]);
        assert!(args.has_bare("r"));
    }

    #[test]
    fn missing_required_positional_is_invalid_args() {
        let schema = ParamSchema { required_positional: vec!["key"], ..ParamSchema::none() };
        assert!(matches!(assemble("zget", &tail("zget"), &schema), Err(Error::InvalidArgs(cmd, _)) if cmd == "zget"));
    }

    #[test]
    fn unknown_flag_is_invalid_args() {
        let schema = ParamSchema { required_positional: vec!["key"], ..ParamSchema::none() };
        assert!(matches!(assemble("zget", &tail("zget k -z"), &schema), Err(Error::InvalidArgs(_, _))));
    }

    #[test]
    fn trailing_raw_keeps_tail_tokens_verbatim() {
        let schema = ParamSchema {
            required_positional: vec!["topic"],
            allow_trailing_raw: true,
            ..ParamSchema::none()
        };
        let args = assemble("count", &tail("count orders where value = 'b'"), &schema).unwrap();
        assert_eq!(args.positional, vec!["orders".to_string()]);
        assert_eq!(
            args.raw_tail,
            vec!["where".to_string(), "value".to_string(), "=".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn trailing_raw_tail_is_empty_when_nothing_follows_required_positional() {
        let schema = ParamSchema {
            required_positional: vec!["topic"],
            allow_trailing_raw: true,
            ..ParamSchema::none()
        };
        let args = assemble("count", &tail("count orders"), &schema).unwrap();
        assert_eq!(args.positional, vec!["orders".to_string()]);
        assert!(args.raw_tail.is_empty());
    }

    #[test]
    fn optional_positional_is_not_required() {
        let schema = ParamSchema { optional_positional: vec!["path"], ..ParamSchema::none() };
        let args = assemble("zls", &tail("zls"), &schema).unwrap();
        assert!(args.positional.is_empty());
        let args = assemble("zls", &tail("zls /a"), &schema).unwrap();
        assert_eq!(args.positional, vec!["/a".to_string()]);
    }
}
