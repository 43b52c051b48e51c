//! Lexer for anchor expressions using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Keywords
    #[token("when")]
    When,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("min")]
    Min,
    #[token("max")]
    Max,
    #[token("share")]
    Share,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("//")]
    SlashSlash,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,

    // Comparisons
    #[token("<=")]
    LessEqual,
    #[token("<")]
    Less,
    #[token(">=")]
    GreaterEqual,
    #[token(">")]
    Greater,

    // Punctuation
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    /// Input the lexer could not match; always a parse error
    Error,
}

/// Tokenize input; unrecognized input becomes [`Token::Error`]
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| (tok.unwrap_or(Token::Error), span))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_tokens() {
        let tokens: Vec<_> = lex("menu.right").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("menu".to_string()),
                Token::Dot,
                Token::Ident("right".to_string()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens: Vec<_> = lex("+ - * / // % ^").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::SlashSlash,
                Token::Percent,
                Token::Caret,
            ]
        );
    }

    #[test]
    fn test_comparisons() {
        let tokens: Vec<_> = lex("< <= > >=").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Less,
                Token::LessEqual,
                Token::Greater,
                Token::GreaterEqual,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens: Vec<_> = lex("when then else and or min max share sidebar")
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::When,
                Token::Then,
                Token::Else,
                Token::And,
                Token::Or,
                Token::Min,
                Token::Max,
                Token::Share,
                Token::Ident("sidebar".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens: Vec<_> = lex("42 3.5 -10").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Number(42.0),
                Token::Number(3.5),
                Token::Minus,
                Token::Number(10.0)
            ]
        );
    }

    #[test]
    fn test_unknown_input_is_an_error_token() {
        let tokens: Vec<_> = lex("a @ b").collect();
        assert_eq!(tokens[1], (Token::Error, 2..3));
    }

    #[test]
    fn test_spans() {
        let spans: Vec<_> = lex("root.width / 2").map(|(_, s)| s).collect();
        assert_eq!(spans, vec![0..4, 4..5, 5..10, 11..12, 13..14]);
    }
}
