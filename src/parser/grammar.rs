//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::layout::{AggregateKind, Attribute, BinaryOp, Comparison};
use crate::parser::ast::*;
use crate::parser::lexer::Token;

type Node = Spanned<ExprNode>;

/// Parse a single anchor expression
pub fn parse_expression(input: &str) -> Result<Node, Vec<crate::ParseError>> {
    let len = input.len();

    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Parse a guard: one or more comparisons joined by `and`
pub fn parse_guard(input: &str) -> Result<Vec<Spanned<PredicateNode>>, Vec<crate::ParseError>> {
    let len = input.len();

    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    guard_parser(expression_parser())
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Left-associative chain of binary operators
fn fold_binary(first: Node, rest: Vec<(BinaryOp, Node)>) -> Node {
    rest.into_iter().fold(first, |left, (op, right)| {
        let span = left.span.start..right.span.end;
        Spanned::new(
            ExprNode::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    })
}

fn guard_parser<'a, I, P>(
    operand: P,
) -> impl Parser<'a, I, Vec<Spanned<PredicateNode>>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
    P: Parser<'a, I, Node, extra::Err<Rich<'a, Token>>> + Clone,
{
    let comparison = choice((
        just(Token::LessEqual).to(Comparison::Le),
        just(Token::Less).to(Comparison::Lt),
        just(Token::GreaterEqual).to(Comparison::Ge),
        just(Token::Greater).to(Comparison::Gt),
    ));

    operand
        .clone()
        .then(comparison)
        .then(operand)
        .map_with(|((left, comparison), right), e| {
            Spanned::new(
                PredicateNode {
                    left,
                    comparison,
                    right,
                },
                span_range(&e.span()),
            )
        })
        .separated_by(just(Token::And))
        .at_least(1)
        .collect::<Vec<_>>()
}

fn expression_parser<'a, I>() -> impl Parser<'a, I, Node, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let number = select! {
            Token::Number(n) => n,
        };

        let attribute = select! {
            Token::Ident(s) => s,
        }
        .try_map(|name, span| {
            name.parse::<Attribute>()
                .map_err(|err| Rich::custom(span, err.to_string()))
        });

        let reference = select! {
            Token::Ident(s) => Identifier::new(s),
        }
        .map_with(|id, e| Spanned::new(id, span_range(&e.span())))
        .then_ignore(just(Token::Dot))
        .then(attribute)
        .map(|(element, attribute)| ExprNode::Reference { element, attribute });

        let aggregate = choice((
            just(Token::Min).to(AggregateKind::Min),
            just(Token::Max).to(AggregateKind::Max),
        ))
        .then(
            expr.clone()
                .separated_by(just(Token::Comma))
                .at_least(1)
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        )
        .map(|(kind, items)| ExprNode::Aggregate { kind, items });

        let share = just(Token::Share)
            .ignore_then(
                expr.clone()
                    .then_ignore(just(Token::Comma))
                    .then(number.clone())
                    .then_ignore(just(Token::Comma))
                    .then(number.clone())
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .map(|((inner, fraction), total)| ExprNode::Share {
                inner: Box::new(inner),
                fraction,
                total,
            });

        let atom = choice((
            number.map(ExprNode::Number),
            reference,
            aggregate,
            share,
        ))
        .map_with(|node, e| Spanned::new(node, span_range(&e.span())))
        .or(expr
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)))
        .boxed();

        // Unary minus binds looser than `^`, so `-2 ^ 2` is `-(2 ^ 2)`
        let unary = recursive(|unary| {
            let power = atom
                .clone()
                .then(just(Token::Caret).ignore_then(unary).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => fold_binary(base, vec![(BinaryOp::Pow, exponent)]),
                    None => base,
                });

            just(Token::Minus)
                .map_with(|_, e| span_range(&e.span()))
                .repeated()
                .collect::<Vec<_>>()
                .then(power)
                .map(|(signs, operand)| {
                    signs.into_iter().rev().fold(operand, |inner, sign| {
                        let span = sign.start..inner.span.end;
                        Spanned::new(ExprNode::Negate(Box::new(inner)), span)
                    })
                })
        })
        .boxed();

        let product_op = choice((
            just(Token::Star).to(BinaryOp::Mul),
            just(Token::SlashSlash).to(BinaryOp::FloorDiv),
            just(Token::Slash).to(BinaryOp::Div),
            just(Token::Percent).to(BinaryOp::Rem),
        ));
        let product = unary
            .clone()
            .then(product_op.then(unary).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| fold_binary(first, rest))
            .boxed();

        let sum_op = choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ));
        let sum = product
            .clone()
            .then(sum_op.then(product).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| fold_binary(first, rest))
            .boxed();

        let conditional = just(Token::When)
            .ignore_then(guard_parser(expr.clone()))
            .then_ignore(just(Token::Then))
            .then(sum.clone())
            .then(just(Token::Else).ignore_then(sum.clone()).or_not())
            .map_with(|((guards, value), fallback), e| {
                Spanned::new(
                    ExprNode::Conditional {
                        guards,
                        value: Box::new(value),
                        fallback: fallback.map(Box::new),
                    },
                    span_range(&e.span()),
                )
            });

        let branch = conditional.or(sum).boxed();

        branch
            .clone()
            .then(just(Token::Or).ignore_then(branch).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| {
                rest.into_iter().fold(first, |value, fallback| {
                    let span = value.span.start..fallback.span.end;
                    Spanned::new(
                        ExprNode::Fallback {
                            value: Box::new(value),
                            fallback: Box::new(fallback),
                        },
                        span,
                    )
                })
            })
    })
}
