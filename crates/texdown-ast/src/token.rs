//! Token definitions shared by the tokenizer and the parser.

use crate::span::Span;
use serde::Serialize;
use std::fmt;

/// Character class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// Horizontal whitespace (spaces, tabs)
    Spacer,
    /// Letters and digits
    Letter,
    /// Punctuation that always stands alone, e.g. `[`, `(`, `!`, `|`
    SeparatedSpecial,
    /// Markup characters that join into same-character runs, e.g. `**`, "```"
    JoinableSpecial,
    /// Line breaks
    Delimiter,
    /// Anything else
    Other,
}

/// A classified run of source characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    /// Absolute byte offset of the first character
    pub pos: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(text: impl Into<String>, pos: usize, kind: TokenKind) -> Self {
        Token {
            text: text.into(),
            pos,
            kind,
        }
    }

    pub fn end(&self) -> usize {
        self.pos + self.text.len()
    }

    pub fn span(&self) -> Span {
        Span::new(self.pos, self.end())
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_spacer(&self) -> bool {
        self.kind == TokenKind::Spacer
    }

    pub fn is_delimiter(&self) -> bool {
        self.kind == TokenKind::Delimiter
    }

    /// Number of line breaks in a delimiter token (`\r\n` counts once).
    pub fn line_breaks(&self) -> usize {
        if self.kind != TokenKind::Delimiter {
            return 0;
        }
        let newlines = self.text.matches('\n').count();
        if newlines == 0 {
            // bare carriage returns
            self.text.len()
        } else {
            newlines
        }
    }

    /// A delimiter spanning one or more blank lines.
    pub fn is_paragraph_break(&self) -> bool {
        self.line_breaks() >= 2
    }

    /// True when every character of the token is `ch`.
    pub fn is_run_of(&self, ch: char) -> bool {
        !self.text.is_empty() && self.text.chars().all(|c| c == ch)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_breaks() {
        assert_eq!(Token::new("\n", 0, TokenKind::Delimiter).line_breaks(), 1);
        assert_eq!(Token::new("\r\n", 0, TokenKind::Delimiter).line_breaks(), 1);
        assert!(Token::new("\n\n", 0, TokenKind::Delimiter).is_paragraph_break());
        assert!(Token::new("\r\n\r\n", 0, TokenKind::Delimiter).is_paragraph_break());
        assert_eq!(Token::new("ab", 0, TokenKind::Letter).line_breaks(), 0);
    }

    #[test]
    fn test_run_of() {
        assert!(Token::new("```", 3, TokenKind::JoinableSpecial).is_run_of('`'));
        assert!(!Token::new("$`", 3, TokenKind::JoinableSpecial).is_run_of('`'));
        assert_eq!(Token::new("```", 3, TokenKind::JoinableSpecial).span(), Span::new(3, 6));
    }
}
