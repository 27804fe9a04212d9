//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::CompileError;
use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Prefix operators as they appear in source, before folding
#[derive(Debug, Clone, Copy)]
enum Prefix {
    Op(UnaryOp),
    Default,
}

/// Postfix operators as they appear in source, before folding
#[derive(Debug, Clone)]
enum Postfix {
    Select(Spanned<String>),
    Index(Spanned<Expr>),
}

/// Parse a module file into an AST
pub fn parse(input: &str) -> Result<File, Vec<CompileError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    file_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Parse a single expression whose source starts at `offset` in the enclosing file
///
/// Used for `\( ... )` interpolations, so spans stay relative to the file.
pub fn parse_expression(input: &str, offset: usize) -> Result<Spanned<Expr>, Vec<CompileError>> {
    let end_of_input = offset + input.len();

    let token_iter = crate::parser::lexer::lex(input)
        .map(move |(tok, span)| (tok, (span.start + offset..span.end + offset).into()));

    let token_stream = Stream::from_iter(token_iter)
        .map((end_of_input..end_of_input).into(), |(t, s): (_, _)| (t, s));

    expr_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn binary(op: BinaryOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    let span = lhs.span.start..rhs.span.end;
    Spanned::new(Expr::Binary(op, Box::new(lhs), Box::new(rhs)), span)
}

/// Decode escapes and split out `\( ... )` interpolations.
///
/// `start` is the file offset of the first character after the opening quote.
fn parse_string_literal(raw: &str, start: usize) -> Result<Expr, (std::ops::Range<usize>, String)> {
    let bytes = raw.as_bytes();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut has_interpolation = false;
    let mut i = 0;

    while i < raw.len() {
        let c = match raw[i..].chars().next() {
            Some(c) => c,
            None => break,
        };
        if c != '\\' {
            text.push(c);
            i += c.len_utf8();
            continue;
        }

        let escape_span = start + i..start + i + 2;
        match bytes.get(i + 1) {
            Some(b'n') => text.push('\n'),
            Some(b't') => text.push('\t'),
            Some(b'r') => text.push('\r'),
            Some(b'"') => text.push('"'),
            Some(b'\\') => text.push('\\'),
            Some(b'/') => text.push('/'),
            Some(b'(') => {
                let open = i + 2;
                let close = matching_paren(bytes, open)
                    .ok_or_else(|| (escape_span.clone(), "unterminated interpolation".to_string()))?;
                let inner = &raw[open..close];
                let expr = parse_expression(inner, start + open).map_err(|errs| {
                    let first = errs.into_iter().next();
                    match first {
                        Some(CompileError::Syntax { span, message, .. }) => {
                            (span, format!("in interpolation: {}", message))
                        }
                        None => (escape_span.clone(), "invalid interpolation".to_string()),
                    }
                })?;
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Expr(expr));
                has_interpolation = true;
                i = close + 1;
                continue;
            }
            _ => {
                return Err((escape_span, "unknown escape sequence".to_string()));
            }
        }
        i += 2;
    }

    if !has_interpolation {
        return Ok(Expr::String(text));
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(Expr::Interpolation(segments))
}

/// Index of the `)` closing an interpolation whose body starts at `from`
fn matching_paren(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b'"' => {
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

fn file_parser<'a, I>() -> impl Parser<'a, I, File, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let package = just(Token::Package)
        .ignore_then(select! { Token::Ident(s) => Identifier::new(s) })
        .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

    let decl = decl_parser(expr_parser());

    package
        .or_not()
        .then(
            decl.then_ignore(just(Token::Comma).or_not())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(end())
        .map(|(package, decls)| File { package, decls })
}

/// Declarations of a struct body: fields, embeddings, `...` and `if` guards
fn decl_parser<'a, I, P>(expr: P) -> impl Parser<'a, I, Spanned<Decl>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
    P: Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone + 'a,
{
    // Keywords are valid labels too
    let plain_label = select! {
        Token::Ident(s) => s,
        Token::Definition(s) => s,
        Token::Package => "package".to_string(),
        Token::If => "if".to_string(),
        Token::True => "true".to_string(),
        Token::False => "false".to_string(),
        Token::Null => "null".to_string(),
    };

    let quoted_label = select! { Token::String(s) => s }.try_map(|raw, span: SimpleSpan| {
        match parse_string_literal(&raw, span_range(&span).start + 1) {
            Ok(Expr::String(s)) => Ok(s),
            Ok(_) => Err(Rich::custom(span, "interpolation is not allowed in a label")),
            Err((span, message)) => Err(Rich::custom(SimpleSpan::from(span), message)),
        }
    });

    let label = choice((plain_label, quoted_label))
        .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    recursive(|decl| {
        // `a: b?: c: value` desugars into nested single-field structs
        let label_colon = label
            .then(just(Token::Question).or_not().map(|q| q.is_some()))
            .then_ignore(just(Token::Colon));

        let field = label_colon
            .clone()
            .then(label_colon.repeated().collect::<Vec<_>>())
            .then(expr.clone())
            .map(|(((label, optional), nested), value)| {
                let value = nested
                    .into_iter()
                    .rev()
                    .fold(value, |value, (label, optional)| {
                        let span = label.span.start..value.span.end;
                        let inner = Field {
                            label,
                            optional,
                            value,
                        };
                        let decl = Spanned::new(Decl::Field(inner), span.clone());
                        Spanned::new(Expr::Struct(vec![decl]), span)
                    });
                Decl::Field(Field {
                    label,
                    optional,
                    value,
                })
            });

        let body = decl
            .then_ignore(just(Token::Comma).or_not())
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

        let guard = just(Token::If)
            .ignore_then(expr.clone())
            .then(body)
            .map(|(condition, body)| Decl::If { condition, body });

        let ellipsis = just(Token::Ellipsis).to(Decl::Ellipsis);

        let embed = expr.clone().map(Decl::Embed);

        // Order matters: a field starts with a label, which also parses as an embedded
        // reference, so fields are tried first.
        choice((field, guard, ellipsis, embed))
            .map_with(|d, e| Spanned::new(d, span_range(&e.span())))
            .boxed()
    })
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let literal = select! {
            Token::Int(n) => Expr::Int(n),
            Token::Float(f) => Expr::Float(f),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
        }
        .map_with(|x, e| Spanned::new(x, span_range(&e.span())));

        let string = select! { Token::String(s) => s }
            .try_map(|raw, span: SimpleSpan| {
                parse_string_literal(&raw, span_range(&span).start + 1)
                    .map_err(|(span, message)| Rich::custom(SimpleSpan::from(span), message))
            })
            .map_with(|x, e| Spanned::new(x, span_range(&e.span())));

        let arguments = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        // Identifier, `_`, or a builtin call such as `len(x)`
        let reference = select! { Token::Ident(s) => s }
            .map_with(|s, e| Spanned::new(Identifier::new(s), span_range(&e.span())))
            .then(arguments.or_not())
            .map_with(|(name, args), e| {
                let node = match args {
                    Some(args) => Expr::Call(name, args),
                    None if name.node.as_str() == "_" => Expr::Top,
                    None => Expr::Ident(name.node),
                };
                Spanned::new(node, span_range(&e.span()))
            });

        let definition = select! { Token::Definition(s) => Expr::Ident(Identifier::new(s)) }
            .map_with(|x, e| Spanned::new(x, span_range(&e.span())));

        let struct_lit = decl_parser(expr.clone())
            .then_ignore(just(Token::Comma).or_not())
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map_with(|decls, e| Spanned::new(Expr::Struct(decls), span_range(&e.span())));

        let list_tail = just(Token::Ellipsis).ignore_then(expr.clone().or_not());

        let list_lit = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .then(list_tail.or_not())
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map_with(|(elements, tail), e| {
                let tail = tail.map(|t| t.map(Box::new));
                Spanned::new(Expr::List(ListLit { elements, tail }), span_range(&e.span()))
            });

        let parenthesized = expr
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
            .map_with(|inner: Spanned<Expr>, e| Spanned::new(inner.node, span_range(&e.span())));

        let atom = choice((
            literal,
            string,
            reference,
            definition,
            struct_lit,
            list_lit,
            parenthesized,
        ));

        // Selectors accept identifiers, definitions and quoted names
        let selector_name = select! {
            Token::Ident(s) => s,
            Token::Definition(s) => s,
        }
        .or(select! { Token::String(s) => s }.try_map(|raw, span: SimpleSpan| {
            match parse_string_literal(&raw, span_range(&span).start + 1) {
                Ok(Expr::String(s)) => Ok(s),
                _ => Err(Rich::custom(span, "selector must be a plain string")),
            }
        }))
        .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

        let postfix_op = choice((
            just(Token::Dot)
                .ignore_then(selector_name)
                .map_with(|name, e| (Postfix::Select(name), span_range(&e.span()).end)),
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map_with(|index, e| (Postfix::Index(index), span_range(&e.span()).end)),
        ));

        let postfix = atom.foldl(postfix_op.repeated(), |base, (op, end)| {
            let span = base.span.start..end;
            let node = match op {
                Postfix::Select(name) => Expr::Selector(Box::new(base), name),
                Postfix::Index(index) => Expr::Index(Box::new(base), Box::new(index)),
            };
            Spanned::new(node, span)
        });

        let prefix_op = choice((
            just(Token::Minus).to(Prefix::Op(UnaryOp::Neg)),
            just(Token::Bang).to(Prefix::Op(UnaryOp::Not)),
            just(Token::Star).to(Prefix::Default),
            just(Token::GreaterOrEqual).to(Prefix::Op(UnaryOp::Bound(BoundOp::GreaterOrEqual))),
            just(Token::Greater).to(Prefix::Op(UnaryOp::Bound(BoundOp::Greater))),
            just(Token::LessOrEqual).to(Prefix::Op(UnaryOp::Bound(BoundOp::LessOrEqual))),
            just(Token::Less).to(Prefix::Op(UnaryOp::Bound(BoundOp::Less))),
            just(Token::NotEq).to(Prefix::Op(UnaryOp::Bound(BoundOp::NotEqual))),
        ))
        .map_with(|op, e| (op, span_range(&e.span()).start));

        let unary = prefix_op.repeated().foldr(postfix, |(op, start), operand| {
            let span = start..operand.span.end;
            let node = match (op, operand.node) {
                // Fold negative literals so bounds like `>=-1` stay simple
                (Prefix::Op(UnaryOp::Neg), Expr::Int(n)) => Expr::Int(-n),
                (Prefix::Op(UnaryOp::Neg), Expr::Float(f)) => Expr::Float(-f),
                (Prefix::Default, node) => {
                    Expr::Default(Box::new(Spanned::new(node, operand.span)))
                }
                (Prefix::Op(op), node) => Expr::Unary(op, Box::new(Spanned::new(node, operand.span))),
            };
            Spanned::new(node, span)
        })
        .boxed();

        let product = unary.clone().foldl(
            choice((
                just(Token::Star).to(BinaryOp::Mul),
                just(Token::Slash).to(BinaryOp::Div),
            ))
            .then(unary)
            .repeated(),
            |lhs, (op, rhs)| binary(op, lhs, rhs),
        ).boxed();

        let sum = product.clone().foldl(
            choice((
                just(Token::Plus).to(BinaryOp::Add),
                just(Token::Minus).to(BinaryOp::Sub),
            ))
            .then(product)
            .repeated(),
            |lhs, (op, rhs)| binary(op, lhs, rhs),
        ).boxed();

        let comparison = sum.clone().foldl(
            choice((
                just(Token::EqEq).to(BinaryOp::Equal),
                just(Token::NotEq).to(BinaryOp::NotEqual),
                just(Token::LessOrEqual).to(BinaryOp::LessOrEqual),
                just(Token::GreaterOrEqual).to(BinaryOp::GreaterOrEqual),
                just(Token::Less).to(BinaryOp::Less),
                just(Token::Greater).to(BinaryOp::Greater),
            ))
            .then(sum)
            .repeated(),
            |lhs, (op, rhs)| binary(op, lhs, rhs),
        ).boxed();

        let logical_and = comparison.clone().foldl(
            just(Token::AndAnd)
                .to(BinaryOp::LogicalAnd)
                .then(comparison)
                .repeated(),
            |lhs, (op, rhs)| binary(op, lhs, rhs),
        ).boxed();

        let logical_or = logical_and.clone().foldl(
            just(Token::OrOr)
                .to(BinaryOp::LogicalOr)
                .then(logical_and)
                .repeated(),
            |lhs, (op, rhs)| binary(op, lhs, rhs),
        ).boxed();

        let conjunction = logical_or.clone().foldl(
            just(Token::Amp).to(BinaryOp::And).then(logical_or).repeated(),
            |lhs, (op, rhs)| binary(op, lhs, rhs),
        ).boxed();

        conjunction
            .clone()
            .foldl(
                just(Token::Pipe).to(BinaryOp::Or).then(conjunction).repeated(),
                |lhs, (op, rhs)| binary(op, lhs, rhs),
            )
            .boxed()
    })
}
