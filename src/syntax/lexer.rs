//! Tokenizer built on `logos`.
//!
//! Produces positioned tokens; line/column information is derived from a
//! line-start table so multi-line strings keep later positions correct.

use std::ops::Range;

use logos::{Lexer, Logos};

use super::ast::ParseError;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\f]+")]
pub enum TokenKind {
    #[token("\n")]
    Newline,
    #[regex(r"\\\r?\n")]
    LineContinuation,
    #[token("#", lex_comment)]
    Comment,

    #[token("\"\"\"", lex_triple_string)]
    #[token("\"", |lex| lex_quoted(lex, b'"'))]
    #[token("'", |lex| lex_quoted(lex, b'\''))]
    String,
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?")]
    #[regex(r"0x[0-9a-fA-F_]+")]
    #[regex(r"0b[01_]+")]
    Number,

    // Declarations
    #[token("func")]
    Func,
    #[token("static")]
    Static,
    #[token("var")]
    Var,
    #[token("const")]
    Const,
    #[token("signal")]
    Signal,
    #[token("class")]
    Class,
    #[token("class_name")]
    ClassName,
    #[token("extends")]
    Extends,
    #[token("enum")]
    Enum,
    #[token("tool")]
    Tool,
    #[token("export")]
    Export,
    #[token("onready")]
    Onready,
    #[token("setget")]
    Setget,

    // Statements
    #[token("return")]
    Return,
    #[token("pass")]
    Pass,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("match")]
    Match,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(":")]
    Colon,
    #[token(":=")]
    ColonAssign,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token("=")]
    Assign,
    #[token("$")]
    Dollar,
    #[regex(r"[-+*/%<>!&|^~]=?")]
    #[token("==")]
    #[token("&&")]
    #[token("||")]
    #[token("<<")]
    #[token(">>")]
    #[token("**")]
    Operator,
}

impl TokenKind {
    /// Opening bracket partner for a closing bracket.
    pub fn opener(self) -> Option<TokenKind> {
        match self {
            TokenKind::RParen => Some(TokenKind::LParen),
            TokenKind::RBracket => Some(TokenKind::LBracket),
            TokenKind::RBrace => Some(TokenKind::LBrace),
            _ => None,
        }
    }

    pub fn is_opener(self) -> bool {
        matches!(self, TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace)
    }

    /// Whether the token can serve as a name (identifiers and soft keywords).
    pub fn is_name(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier | TokenKind::Export | TokenKind::Onready | TokenKind::Setget
        )
    }
}

fn lex_comment(lex: &mut Lexer<TokenKind>) -> bool {
    let rest = lex.remainder();
    let end = rest.find('\n').unwrap_or(rest.len());
    lex.bump(end);
    true
}

fn lex_quoted(lex: &mut Lexer<TokenKind>, quote: u8) -> bool {
    let bytes = lex.remainder().as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return false,
            b if b == quote => {
                lex.bump(i + 1);
                return true;
            }
            _ => i += 1,
        }
    }
    false
}

fn lex_triple_string(lex: &mut Lexer<TokenKind>) -> bool {
    match lex.remainder().find("\"\"\"") {
        Some(end) => {
            lex.bump(end + 3);
            true
        }
        None => false,
    }
}

/// A positioned token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
    /// Byte span in the source.
    pub span: Range<usize>,
    /// 1-indexed line.
    pub line: u32,
    /// 0-indexed character column.
    pub column: u32,
}

/// Byte offsets of line starts, for offset → line/column conversion.
struct LineStarts<'s> {
    source: &'s str,
    starts: Vec<usize>,
}

impl<'s> LineStarts<'s> {
    fn new(source: &'s str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { source, starts }
    }

    /// 1-indexed line and 0-indexed character column of a byte offset.
    fn locate(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        let start = self.starts[line];
        let column = self.source.get(start..offset).map_or(0, |s| s.chars().count());
        (line as u32 + 1, column as u32)
    }
}

/// Tokenize a whole source text.
///
/// Stops at the first unrecognized or unterminated token.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ParseError> {
    match tokenize_partial(source) {
        (tokens, None) => Ok(tokens),
        (_, Some(error)) => Err(error),
    }
}

/// Like [`tokenize`], but also returns the tokens read before the error.
pub fn tokenize_partial(source: &str) -> (Vec<Token<'_>>, Option<ParseError>) {
    let lines = LineStarts::new(source);
    let mut tokens = Vec::new();

    for (result, span) in TokenKind::lexer(source).spanned() {
        let (line, column) = lines.locate(span.start);
        let text = &source[span.clone()];
        match result {
            Ok(kind) => tokens.push(Token {
                kind,
                text,
                span,
                line,
                column,
            }),
            Err(()) => {
                let message = match text.chars().next() {
                    Some('"') | Some('\'') => "Unterminated string.".to_string(),
                    Some(c) => format!("Unexpected character '{}'.", c),
                    None => "Unexpected end of file.".to_string(),
                };
                return (tokens, Some(ParseError::new(message, line, column)));
            }
        }
    }

    (tokens, None)
}
