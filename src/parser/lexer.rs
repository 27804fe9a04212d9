//! Lexer for the module language using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Keywords
    #[token("package")]
    Package,
    #[token("if")]
    If,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Operators (longer patterns first)
    #[token("...")]
    Ellipsis,
    #[token("||")]
    OrOr,
    #[token("&&")]
    AndAnd,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessOrEqual,
    #[token(">=")]
    GreaterOrEqual,
    #[token("|")]
    Pipe,
    #[token("&")]
    Amp,
    #[token("!")]
    Bang,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r"#[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Definition(String),

    /// Raw string contents between the quotes, escapes and interpolations untouched
    #[token("\"", lex_string)]
    String(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    /// Input the lexer could not make sense of; never matched by logos itself
    Error,
}

/// Scan a double-quoted string, keeping `\( ... )` interpolations intact even
/// when they contain nested quotes or parentheses.
fn lex_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if depth == 0 => {
                if bytes.get(i + 1) == Some(&b'(') {
                    depth = 1;
                }
                i += 2;
                continue;
            }
            b'"' if depth == 0 => {
                lex.bump(i + 1);
                return Some(rest[..i].to_string());
            }
            b'\n' if depth == 0 => return None,
            b'(' if depth > 0 => depth += 1,
            b')' if depth > 0 => depth -= 1,
            b'"' if depth > 0 => {
                // Nested string inside an interpolation
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Lex input string into tokens with spans
///
/// Unrecognized input becomes [`Token::Error`] so the parser reports it at
/// the right position instead of silently skipping it.
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| (tok.unwrap_or(Token::Error), span))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).map(|(t, _)| t).collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens("package if true false null"),
            vec![Token::Package, Token::If, Token::True, Token::False, Token::Null]
        );
    }

    #[test]
    fn test_field_declaration() {
        assert_eq!(
            tokens("replicas: *1 | int"),
            vec![
                Token::Ident("replicas".to_string()),
                Token::Colon,
                Token::Star,
                Token::Int(1),
                Token::Pipe,
                Token::Ident("int".to_string()),
            ]
        );
    }

    #[test]
    fn test_definitions_and_optional_fields() {
        assert_eq!(
            tokens("#Port: { name?: string }"),
            vec![
                Token::Definition("#Port".to_string()),
                Token::Colon,
                Token::BraceOpen,
                Token::Ident("name".to_string()),
                Token::Question,
                Token::Colon,
                Token::Ident("string".to_string()),
                Token::BraceClose,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("42 3.5 1e3 -7"),
            vec![
                Token::Int(42),
                Token::Float(3.5),
                Token::Float(1000.0),
                Token::Minus,
                Token::Int(7),
            ]
        );
    }

    #[test]
    fn test_comparison_and_logic_operators() {
        assert_eq!(
            tokens(">= <= > < == != && || !"),
            vec![
                Token::GreaterOrEqual,
                Token::LessOrEqual,
                Token::Greater,
                Token::Less,
                Token::EqEq,
                Token::NotEq,
                Token::AndAnd,
                Token::OrOr,
                Token::Bang,
            ]
        );
    }

    #[test]
    fn test_ellipsis_and_dot() {
        assert_eq!(
            tokens("[...a.b]"),
            vec![
                Token::BracketOpen,
                Token::Ellipsis,
                Token::Ident("a".to_string()),
                Token::Dot,
                Token::Ident("b".to_string()),
                Token::BracketClose,
            ]
        );
    }

    #[test]
    fn test_plain_string() {
        assert_eq!(
            tokens(r#""hello world""#),
            vec![Token::String("hello world".to_string())]
        );
    }

    #[test]
    fn test_string_with_escaped_quote() {
        assert_eq!(
            tokens(r#""say \"hi\"" x"#),
            vec![
                Token::String(r#"say \"hi\""#.to_string()),
                Token::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_interpolation_with_nested_quotes() {
        let toks = tokens(r#"name: "\(parameters.name + "-svc")""#);
        assert_eq!(
            toks,
            vec![
                Token::Ident("name".to_string()),
                Token::Colon,
                Token::String(r#"\(parameters.name + "-svc")"#.to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens("a: 1 // trailing\nb: 2"),
            vec![
                Token::Ident("a".to_string()),
                Token::Colon,
                Token::Int(1),
                Token::Ident("b".to_string()),
                Token::Colon,
                Token::Int(2),
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_error_token() {
        let toks = tokens("a: @");
        assert_eq!(toks.last(), Some(&Token::Error));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let toks = tokens("a: \"open\nb: 1");
        assert!(toks.contains(&Token::Error));
    }
}
