use anyhow::{anyhow, Result};
use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum TokenKind {
    #[regex(r"[ \t\r\n,]+", logos::skip)]
    Whitespace,
    #[regex(r";[^\n]*", logos::skip)]
    LineComment,

    // Strings: double-quoted, no escapes
    #[regex(r#""[^"\n]*""#)]
    String,
    #[regex(r"-?[0-9]+(\.[0-9]+)?")]
    Number,
    #[regex(r"#[0-9a-fA-F]+")]
    Color,
    #[regex(r":[A-Za-z_][A-Za-z0-9_\-]*")]
    Symbol,
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$\-?!]*")]
    Ident,

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

    #[error]
    Error,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

pub fn lex(input: &str) -> Result<Vec<Token>> {
    let mut lex = TokenKind::lexer(input);
    // Precompute line starts for line/col mapping
    let mut line_starts: Vec<usize> = vec![0];
    for (i, ch) in input.char_indices() {
        if ch == '\n' {
            line_starts.push(i + 1);
        }
    }
    let find_line_col = |start: usize| -> (usize, usize) {
        let lo = line_starts.partition_point(|&s| s <= start) - 1;
        (lo + 1, start - line_starts[lo] + 1)
    };
    let mut tokens = Vec::new();
    while let Some(kind) = lex.next() {
        let text = lex.slice().to_string();
        let (line, col) = find_line_col(lex.span().start);
        if matches!(kind, TokenKind::Error) {
            return Err(anyhow!("lex error at {}:{} near '{}'", line, col, text));
        }
        tokens.push(Token {
            kind,
            text,
            line,
            col,
        });
    }
    Ok(tokens)
}
