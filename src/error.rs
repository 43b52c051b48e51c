//! Error types for parsing anchor expressions

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                let written = Report::build(ReportKind::Error, filename, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                if written.is_err() {
                    return self.to_string();
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        // A keyword where a name was expected deserves its own hint
        let reserved = err.found().and_then(keyword_name);

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match reserved {
                Some(keyword) => format!(
                    "Cannot use '{}' as a name - it's a reserved keyword",
                    keyword
                ),
                None => {
                    let found_str = match found {
                        Some(tok) => format_token(tok),
                        None => "end of input".to_string(),
                    };
                    format!("Unexpected {}", found_str)
                }
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

fn keyword_name(tok: &Token) -> Option<&'static str> {
    match tok {
        Token::When => Some("when"),
        Token::Then => Some("then"),
        Token::Else => Some("else"),
        Token::And => Some("and"),
        Token::Or => Some("or"),
        Token::Min => Some("min"),
        Token::Max => Some("max"),
        Token::Share => Some("share"),
        _ => None,
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    if let Some(keyword) = keyword_name(tok) {
        return format!("keyword '{}'", keyword);
    }
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Number(n) => format!("number {}", n),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::SlashSlash => "'//'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::Caret => "'^'".to_string(),
        Token::Less => "'<'".to_string(),
        Token::LessEqual => "'<='".to_string(),
        Token::Greater => "'>'".to_string(),
        Token::GreaterEqual => "'>='".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Comma => "','".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Error => "unrecognized input".to_string(),
        _ => format!("{:?}", tok),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    #[test]
    fn test_unexpected_token_message() {
        let errors = parse_expression("menu.left +").unwrap_err();
        match &errors[0] {
            ParseError::Syntax { message, .. } => {
                assert!(message.starts_with("Unexpected"), "got: {message}");
            }
        }
    }

    #[test]
    fn test_reserved_keyword_message() {
        let errors = parse_expression("then.left").unwrap_err();
        match &errors[0] {
            ParseError::Syntax { message, .. } => {
                assert!(message.contains("reserved keyword"), "got: {message}");
            }
        }
    }

    #[test]
    fn test_format_includes_source_line() {
        let source = "root.width * @";
        let errors = parse_expression(source).unwrap_err();
        let report = errors[0].format(source, "anchors");
        assert!(report.contains("anchors"));
        assert!(report.contains("root.width *"));
    }
}
