//! Extraction of the attribute names an SQL condition refers to

use sqlparser::{
    dialect::MySqlDialect,
    tokenizer::{Token, Tokenizer, TokenizerError},
};
use std::collections::BTreeSet;

/// Lower case words that may appear unquoted in a condition without naming an attribute
const RESERVED: &[&str] = &[
    "and", "as", "asc", "between", "binary", "case", "collate", "day", "desc", "distinct", "div",
    "else", "end", "escape", "exists", "false", "from", "hour", "in", "interval", "is", "like",
    "minute", "mod", "month", "not", "null", "or", "regexp", "rlike", "second", "select", "then",
    "true", "unknown", "week", "when", "where", "xor", "year",
    // functions callable without parentheses
    "current_date", "current_time", "current_timestamp", "current_user", "localtime",
    "localtimestamp", "utc_date", "utc_time", "utc_timestamp",
];

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Collect the attribute names referenced by an SQL condition
///
/// Back-quoted identifiers are always attributes. Unquoted lower case identifiers are attributes
/// unless they are reserved words, function names (followed by `(`) or qualified members (after `.`).
/// String literals and numbers are never attributes.
pub fn attribute_names(sql: &str) -> Result<BTreeSet<String>, TokenizerError> {
    let dialect = MySqlDialect {};
    let mut tokenizer = Tokenizer::new(&dialect, sql);
    let tokens: Vec<Token> = tokenizer
        .tokenize()?
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)))
        .collect();
    let mut names = BTreeSet::new();
    for (index, token) in tokens.iter().enumerate() {
        if let Token::Word(word) = token {
            match word.quote_style {
                Some('`') => {
                    names.insert(word.value.clone());
                }
                Some(_) => {}
                None => {
                    let after_period = index > 0 && tokens[index - 1] == Token::Period;
                    let before_paren = tokens.get(index + 1) == Some(&Token::LParen);
                    if is_identifier(&word.value)
                        && !after_period
                        && !before_paren
                        && !RESERVED.contains(&word.value.as_str())
                    {
                        names.insert(word.value.clone());
                    }
                }
            }
        }
    }
    Ok(names)
}
