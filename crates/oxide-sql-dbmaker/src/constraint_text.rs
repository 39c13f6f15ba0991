//! Column extraction from stored CHECK constraint text.
//!
//! DBMaker keeps constraint expressions as raw text in `SYSCOLUMN.CONSTR`
//! and `SYSTABLE.CONSTR`. Tokenization is delegated to the `sqlparser`
//! tokenizer; this module only walks the token stream.

use std::sync::LazyLock;

use regex::Regex;
use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, TokenizerError};
use tracing::warn;

/// Coarse classification of a token, independent of the tokenizer crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTokenKind {
    /// Unquoted identifier.
    Name,
    /// Reserved or non-reserved SQL keyword.
    Keyword,
    /// Identifier in double quotes, backticks or brackets.
    QuotedIdentifier,
    /// Single-quoted string literal.
    StringLiteral,
    /// Numeric literal.
    Number,
    /// `(`, `)`, `,`, `;` and similar.
    Punctuation,
    /// Operators and anything else.
    Other,
}

/// One token of a constraint expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanToken {
    /// Token classification.
    pub kind: ScanTokenKind,
    /// Token text as written, including any quotes.
    pub text: String,
    /// Whether the token is whitespace or a comment.
    pub is_whitespace: bool,
}

impl ScanToken {
    fn is_punct(&self, text: &str) -> bool {
        self.kind == ScanTokenKind::Punctuation && self.text == text
    }
}

/// Splits `text` into classified tokens.
pub fn tokenize(text: &str) -> Result<Vec<ScanToken>, TokenizerError> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, text).tokenize()?;
    Ok(tokens.into_iter().map(classify).collect())
}

fn classify(token: Token) -> ScanToken {
    let is_whitespace = matches!(token, Token::Whitespace(_));
    let kind = match &token {
        Token::Word(word) if word.quote_style.is_some() => ScanTokenKind::QuotedIdentifier,
        Token::Word(word) if word.keyword == Keyword::NoKeyword => ScanTokenKind::Name,
        Token::Word(_) => ScanTokenKind::Keyword,
        Token::SingleQuotedString(_) | Token::NationalStringLiteral(_) => {
            ScanTokenKind::StringLiteral
        }
        Token::Number(..) => ScanTokenKind::Number,
        Token::LParen | Token::RParen | Token::Comma | Token::SemiColon | Token::Period => {
            ScanTokenKind::Punctuation
        }
        _ => ScanTokenKind::Other,
    };
    ScanToken {
        kind,
        text: token.to_string(),
        is_whitespace,
    }
}

/// Returns the column names referenced by a constraint expression.
///
/// Unquoted names and keywords match `columns` case-insensitively and are
/// returned as spelled in the expression; quoted identifiers match exactly
/// after their quotes are stripped. The scan ends at the first comma at
/// depth zero or at a closing parenthesis that would take the depth below
/// zero, so text belonging to the next constraint is never consumed.
/// Names are returned in discovery order and may repeat.
pub fn check_columns<S: AsRef<str>>(sql: &str, columns: &[S]) -> Vec<String> {
    let tokens = match tokenize(sql) {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!(sql = %sql, error = %e, "Unable to tokenize constraint text");
            return Vec::new();
        }
    };

    let mut depth: i32 = 0;
    let mut found = Vec::new();
    for token in tokens.iter().filter(|t| !t.is_whitespace) {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth -= 1;
            if depth < 0 {
                break;
            }
        } else if depth == 0 && token.is_punct(",") {
            break;
        }

        match token.kind {
            ScanTokenKind::Name | ScanTokenKind::Keyword => {
                let folded = token.text.to_uppercase();
                if columns.iter().any(|c| c.as_ref().to_uppercase() == folded) {
                    found.push(token.text.clone());
                }
            }
            ScanTokenKind::QuotedIdentifier => {
                let inner = strip_quotes(&token.text);
                if columns.iter().any(|c| c.as_ref() == inner) {
                    found.push(inner.to_string());
                }
            }
            _ => {}
        }
    }
    found
}

static VALUE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bvalue\b").expect("VALUE pattern is valid"));

/// Replaces the `VALUE` placeholder of a column-level constraint with the
/// owning column's name.
pub fn substitute_value_keyword(sql: &str, column: &str) -> String {
    VALUE_KEYWORD.replace_all(sql, regex::NoExpand(column)).into_owned()
}

fn strip_quotes(text: &str) -> &str {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(_)) if matches!(open, '"' | '`' | '[') => {
            &text[open.len_utf8()..text.len() - 1]
        }
        _ => text,
    }
}
