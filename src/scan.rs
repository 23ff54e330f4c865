//! Placeholder scanning over raw SQL.
//!
//! Placeholders are `:name` tokens found outside string literals and quoted identifiers.
//! A `::` cast is never a placeholder.

use std::collections::HashMap;

use crate::{quoter::Quoter, value::Params};

/// Rewrites every placeholder for which `replace` returns a value, keeps the others.
pub(crate) fn rewrite_placeholders<F>(sql: &str, mut replace: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    enum State {
        Normal,
        Quoted(char),
    }

    let mut out = String::with_capacity(sql.len());
    let mut state = State::Normal;
    let mut span_start = 0;

    let mut chars = sql.char_indices().peekable();
    while let Some((index, char)) = chars.next() {
        match state {
            State::Normal => match char {
                '\'' | '"' | '`' => state = State::Quoted(char),
                ':' => {
                    match chars.peek() {
                        // cast
                        Some(&(_, ':')) => {
                            chars.next();
                        }
                        Some(&(_, next)) if next.is_ascii_alphabetic() || next == '_' => {
                            let start = index;
                            let mut end = index + 1;
                            while let Some(&(next_idx, next_ch)) = chars.peek() {
                                if next_ch.is_ascii_alphanumeric() || next_ch == '_' {
                                    end = next_idx + next_ch.len_utf8();
                                    chars.next();
                                } else {
                                    break;
                                }
                            }
                            if let Some(replacement) = replace(&sql[start..end]) {
                                out.push_str(&sql[span_start..start]);
                                out.push_str(&replacement);
                                span_start = end;
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            },
            State::Quoted(quote) => {
                if char == quote {
                    // doubled quote escapes itself
                    if let Some(&(_, next)) = chars.peek() {
                        if next == quote {
                            chars.next();
                            continue;
                        }
                    }
                    state = State::Normal;
                }
            }
        }
    }

    if span_start < sql.len() {
        out.push_str(&sql[span_start..]);
    }
    out
}

/// Placeholders referenced by the SQL, in order of appearance.
pub fn placeholders(sql: &str) -> Vec<String> {
    let mut found = Vec::new();
    rewrite_placeholders(sql, |name| {
        found.push(name.to_string());
        None
    });
    found
}

/// Renames placeholders according to `renames` (old name → new name).
pub(crate) fn rename_placeholders(sql: &str, renames: &HashMap<String, String>) -> String {
    if renames.is_empty() {
        return sql.to_string();
    }
    rewrite_placeholders(sql, |name| renames.get(name).cloned())
}

/// Replaces bound placeholders by quoted literals. Unknown placeholders are kept.
pub(crate) fn inline_params(sql: &str, params: &Params, quoter: &Quoter) -> String {
    if params.is_empty() {
        return sql.to_string();
    }
    rewrite_placeholders(sql, |name| {
        params
            .get(name)
            .map(|param| quoter.quote_value(&param.value))
    })
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;

    use super::*;

    #[test]
    fn test_placeholders_skip_literals() {
        let sql = "SELECT ':no', \":nope\" FROM t WHERE a = :qp0 AND b = :qp1";
        assert_eq!(vec![":qp0", ":qp1"], placeholders(sql));
    }

    #[test]
    fn test_placeholders_skip_cast() {
        let sql = "SELECT :qp0::jsonb, a::text";
        assert_eq!(vec![":qp0"], placeholders(sql));
    }

    #[test]
    fn test_placeholders_doubled_quote() {
        let sql = "SELECT 'it'':s' = :a";
        assert_eq!(vec![":a"], placeholders(sql));
    }

    #[test]
    fn test_rename_is_whole_token() {
        let renames = HashMap::from([(":qp1".to_string(), ":qp5".to_string())]);
        assert_eq!(
            "a = :qp5 OR b = :qp10",
            rename_placeholders("a = :qp1 OR b = :qp10", &renames)
        );
    }

    #[test]
    fn test_inline_params() {
        let quoter = Quoter::new(Dialect::Postgres, "");
        let params = Params::from([(":qp0", "it's"), (":qp1", "b")]);
        assert_eq!(
            "a = 'it''s' AND b = 'b' AND c = :other",
            inline_params("a = :qp0 AND b = :qp1 AND c = :other", &params, &quoter)
        );
    }
}
