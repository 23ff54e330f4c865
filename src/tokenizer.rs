//! Lightweight SQL tokenizer.
//!
//! This is not a parser. It only splits SQL into statements and a shallow token tree so
//! callers can detect statement boundaries or the presence of a clause keyword.

use crate::error::{Error, Result};

const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "CHECK",
    "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC",
    "DISTINCT", "DO", "DROP", "ELSE", "END", "EXISTS", "FALSE", "FOR", "FOREIGN", "FROM", "FULL",
    "GROUP", "HAVING", "ILIKE", "IN", "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY",
    "LEFT", "LIKE", "LIMIT", "NOT", "NOTHING", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER",
    "PRIMARY", "RECURSIVE", "REFERENCES", "RENAME", "RETURNING", "RIGHT", "ROLLBACK", "SELECT",
    "SET", "TABLE", "THEN", "TO", "TRUE", "TRUNCATE", "UNION", "UNIQUE", "UPDATE", "VALUES",
    "VIEW", "WHEN", "WHERE", "WITH",
];

const MULTI_CHAR_OPERATORS: &[&str] = &["->>", "<=", ">=", "<>", "!=", "||", "::", "->", "=>"];

const OPERATOR_CHARS: &str = "=<>!+-*/%|&^~,.:?@";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Code,
    Statement,
    Token,
    Parenthesis,
    Keyword,
    Operator,
    Identifier,
    StringLiteral,
}

impl TokenKind {
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            TokenKind::Code | TokenKind::Statement | TokenKind::Parenthesis
        )
    }
}

/// One node of the token tree. Offsets are byte offsets into the tokenized source.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlToken {
    kind: TokenKind,
    content: String,
    start: usize,
    end: usize,
    children: Vec<SqlToken>,
}

impl SqlToken {
    pub fn new(kind: TokenKind, content: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            kind,
            content: content.into(),
            start,
            end,
            children: Vec::new(),
        }
    }

    fn collection(kind: TokenKind, start: usize) -> Self {
        Self::new(kind, String::new(), start, start)
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Unquoted content of a leaf token, empty for collections.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn children(&self) -> &[SqlToken] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&SqlToken> {
        self.children.get(index)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Source text covered by this token.
    pub fn sql<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or_default()
    }

    pub fn push(&mut self, token: SqlToken) {
        self.children.push(token);
        self.update_offsets();
    }

    pub fn insert(&mut self, index: usize, token: SqlToken) {
        let index = index.min(self.children.len());
        self.children.insert(index, token);
        self.update_offsets();
    }

    pub fn remove(&mut self, index: usize) -> Option<SqlToken> {
        if index >= self.children.len() {
            return None;
        }
        let token = self.children.remove(index);
        self.update_offsets();
        Some(token)
    }

    /// Recomputes collection offsets from the children, deepest first.
    pub fn update_offsets(&mut self) {
        for child in &mut self.children {
            child.update_offsets();
        }
        let (Some(first), Some(last)) = (self.children.first(), self.children.last()) else {
            return;
        };
        match self.kind {
            TokenKind::Code | TokenKind::Statement => {
                self.start = first.start;
                self.end = last.end;
            }
            // keeps the enclosing parentheses
            TokenKind::Parenthesis => {
                self.start = self.start.min(first.start);
                self.end = self.end.max(last.end);
            }
            _ => {}
        }
    }

    /// Index of the first direct child keyword equal to `keyword`, case-insensitive.
    pub fn find_keyword(&self, keyword: &str) -> Option<usize> {
        self.children.iter().position(|token| {
            token.kind == TokenKind::Keyword && token.content.eq_ignore_ascii_case(keyword)
        })
    }

    /// Index where `keywords` appear as consecutive direct children.
    pub fn find_keywords(&self, keywords: &[&str]) -> Option<usize> {
        if keywords.is_empty() || keywords.len() > self.children.len() {
            return None;
        }
        self.children.windows(keywords.len()).position(|window| {
            window.iter().zip(keywords).all(|(token, keyword)| {
                token.kind == TokenKind::Keyword && token.content.eq_ignore_ascii_case(keyword)
            })
        })
    }

    /// Statements of a `Code` root.
    pub fn statements(&self) -> impl Iterator<Item = &SqlToken> {
        self.children
            .iter()
            .filter(|token| token.kind == TokenKind::Statement)
    }
}

pub struct SqlTokenizer<'a> {
    sql: &'a str,
}

impl<'a> SqlTokenizer<'a> {
    pub fn new(sql: &'a str) -> Self {
        Self { sql }
    }

    /// Splits the SQL into a `Code` root holding one `Statement` per `;`-separated statement.
    pub fn tokenize(&self) -> Result<SqlToken> {
        let sql = self.sql;
        let bytes = sql.as_bytes();
        let mut code = SqlToken::collection(TokenKind::Code, 0);
        // innermost collection last, the statement is always at the bottom
        let mut stack = vec![SqlToken::collection(TokenKind::Statement, 0)];

        let mut offset = 0;
        while offset < sql.len() {
            let rest = &sql[offset..];
            let Some(char) = rest.chars().next() else {
                break;
            };

            if char.is_whitespace() {
                offset += char.len_utf8();
                continue;
            }

            if rest.starts_with("--") {
                offset += rest.find('\n').unwrap_or(rest.len());
                continue;
            }

            if rest.starts_with("/*") {
                offset += rest[2..].find("*/").map(|end| end + 4).unwrap_or(rest.len());
                continue;
            }

            match char {
                '\'' => {
                    let (content, end) = read_quoted(sql, offset, '\'').ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "Unterminated string literal at offset {offset}."
                        ))
                    })?;
                    push_leaf(&mut stack, TokenKind::StringLiteral, &content, offset, end);
                    offset = end;
                }
                '"' | '`' | '[' => {
                    let close = if char == '[' { ']' } else { char };
                    let (content, end) = read_quoted(sql, offset, close).ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "Unterminated quoted identifier at offset {offset}."
                        ))
                    })?;
                    push_leaf(&mut stack, TokenKind::Identifier, &content, offset, end);
                    offset = end;
                }
                '(' => {
                    stack.push(SqlToken::collection(TokenKind::Parenthesis, offset));
                    offset += 1;
                }
                ')' => {
                    if stack.len() < 2 {
                        return Err(Error::invalid_argument(format!(
                            "Unbalanced parenthesis at offset {offset}."
                        )));
                    }
                    if let Some(mut group) = stack.pop() {
                        group.end = offset + 1;
                        group.update_offsets();
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(group);
                        }
                    }
                    offset += 1;
                }
                ';' if stack.len() == 1 => {
                    if let Some(mut statement) = stack.pop() {
                        if !statement.is_empty() {
                            statement.update_offsets();
                            code.children.push(statement);
                        }
                    }
                    offset += 1;
                    stack.push(SqlToken::collection(TokenKind::Statement, offset));
                }
                ':' if bytes
                    .get(offset + 1)
                    .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') =>
                {
                    let end = scan_word(sql, offset + 1);
                    push_leaf(&mut stack, TokenKind::Token, &sql[offset..end], offset, end);
                    offset = end;
                }
                _ if char.is_alphabetic() || char == '_' => {
                    let end = scan_word(sql, offset);
                    let word = &sql[offset..end];
                    let kind = if KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word)) {
                        TokenKind::Keyword
                    } else {
                        TokenKind::Token
                    };
                    push_leaf(&mut stack, kind, word, offset, end);
                    offset = end;
                }
                _ if char.is_ascii_digit() => {
                    let end = scan_number(sql, offset);
                    push_leaf(&mut stack, TokenKind::Token, &sql[offset..end], offset, end);
                    offset = end;
                }
                _ => {
                    let operator = MULTI_CHAR_OPERATORS
                        .iter()
                        .find(|op| rest.starts_with(**op))
                        .copied();
                    let (kind, len) = match operator {
                        Some(op) => (TokenKind::Operator, op.len()),
                        None if OPERATOR_CHARS.contains(char) || char == ';' => {
                            (TokenKind::Operator, char.len_utf8())
                        }
                        None => (TokenKind::Token, char.len_utf8()),
                    };
                    let end = offset + len;
                    push_leaf(&mut stack, kind, &sql[offset..end], offset, end);
                    offset = end;
                }
            }
        }

        if stack.len() > 1 {
            return Err(Error::invalid_argument("Unbalanced parenthesis at end of input."));
        }
        if let Some(mut statement) = stack.pop() {
            if !statement.is_empty() {
                statement.update_offsets();
                code.children.push(statement);
            }
        }
        code.update_offsets();
        Ok(code)
    }
}

fn push_leaf(stack: &mut [SqlToken], kind: TokenKind, content: &str, start: usize, end: usize) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(SqlToken::new(kind, content, start, end));
    }
}

/// Reads a quoted run starting at `start`, a doubled closing quote escapes itself.
fn read_quoted(sql: &str, start: usize, close: char) -> Option<(String, usize)> {
    let mut content = String::new();
    let mut chars = sql[start..].char_indices().skip(1).peekable();
    while let Some((index, char)) = chars.next() {
        if char == close {
            if close != ']' {
                if let Some(&(_, next)) = chars.peek() {
                    if next == close {
                        content.push(char);
                        chars.next();
                        continue;
                    }
                }
            }
            return Some((content, start + index + char.len_utf8()));
        }
        content.push(char);
    }
    None
}

fn scan_word(sql: &str, start: usize) -> usize {
    sql[start..]
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
        .map(|(index, _)| start + index)
        .unwrap_or(sql.len())
}

fn scan_number(sql: &str, start: usize) -> usize {
    sql[start..]
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(index, _)| start + index)
        .unwrap_or(sql.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements() {
        let sql = "SELECT 1; SELECT ';' FROM t;; ";
        let code = SqlTokenizer::new(sql).tokenize().unwrap();
        let statements: Vec<_> = code.statements().map(|s| s.sql(sql)).collect();
        assert_eq!(vec!["SELECT 1", "SELECT ';' FROM t"], statements);
    }

    #[test]
    fn test_token_kinds() {
        let sql = "select \"a\"\"b\", 'x''y' from t where a <> :p -- comment";
        let code = SqlTokenizer::new(sql).tokenize().unwrap();
        let statement = code.child(0).unwrap();
        let kinds: Vec<_> = statement.children().iter().map(|t| t.kind()).collect();
        assert_eq!(
            vec![
                TokenKind::Keyword,
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::StringLiteral,
                TokenKind::Keyword,
                TokenKind::Token,
                TokenKind::Keyword,
                TokenKind::Token,
                TokenKind::Operator,
                TokenKind::Token,
            ],
            kinds
        );
        assert_eq!("a\"b", statement.child(1).unwrap().content());
        assert_eq!("x'y", statement.child(3).unwrap().content());
        assert_eq!("<>", statement.child(8).unwrap().content());
        assert_eq!(":p", statement.child(9).unwrap().content());
    }

    #[test]
    fn test_parenthesis_groups() {
        let sql = "INSERT INTO t (a) SELECT a FROM (SELECT a FROM s WHERE b) x";
        let code = SqlTokenizer::new(sql).tokenize().unwrap();
        let statement = code.child(0).unwrap();
        // the WHERE is nested, not at statement level
        assert_eq!(None, statement.find_keyword("where"));
        assert_eq!(Some(0), statement.find_keywords(&["insert", "into"]));
        let group = statement
            .children()
            .iter()
            .filter(|t| t.kind() == TokenKind::Parenthesis)
            .nth(1)
            .unwrap();
        assert_eq!("(SELECT a FROM s WHERE b)", group.sql(sql));
        assert!(group.find_keyword("WHERE").is_some());
    }

    #[test]
    fn test_unbalanced() {
        assert!(SqlTokenizer::new("SELECT (1").tokenize().is_err());
        assert!(SqlTokenizer::new("SELECT 1)").tokenize().is_err());
        assert!(SqlTokenizer::new("SELECT 'x").tokenize().is_err());
    }

    #[test]
    fn test_offsets_recomputed() {
        let sql = "a b c";
        let code = SqlTokenizer::new(sql).tokenize().unwrap();
        let mut statement = code.child(0).unwrap().clone();
        assert_eq!((0, 5), (statement.start(), statement.end()));
        statement.remove(0);
        assert_eq!((2, 5), (statement.start(), statement.end()));
        statement.push(SqlToken::new(TokenKind::Token, "d", 6, 7));
        assert_eq!("b c d", &"a b c d"[statement.start()..statement.end()]);
    }
}
