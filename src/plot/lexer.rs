//! Tokenizer for plot programs

use super::PlotError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Str(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `^` or `**`
    Caret,
    LParen,
    RParen,
    Comma,
    Assign,
    DotDot,
    /// Newline or `;`
    Separator,
    Eof,
}

impl Token {
    /// Short description used in syntax errors
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {n}"),
            Self::Ident(name) => format!("'{name}'"),
            Self::Str(_) => "string".to_string(),
            Self::Plus => "'+'".to_string(),
            Self::Minus => "'-'".to_string(),
            Self::Star => "'*'".to_string(),
            Self::Slash => "'/'".to_string(),
            Self::Percent => "'%'".to_string(),
            Self::Caret => "'^'".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Assign => "'='".to_string(),
            Self::DotDot => "'..'".to_string(),
            Self::Separator => "end of statement".to_string(),
            Self::Eof => "end of program".to_string(),
        }
    }
}

/// Token with the 1-based line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

/// Split a program into tokens. The result always ends with [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, PlotError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            '\n' => {
                tokens.push(Spanned {
                    token: Token::Separator,
                    line,
                });
                line += 1;
                i += 1;
                continue;
            }
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            ';' => Token::Separator,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Caret
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '=' => Token::Assign,
            '.' if chars.get(i + 1) == Some(&'.') => {
                i += 1;
                Token::DotDot
            }
            '"' | '\'' => {
                let (text, next, lines) = lex_string(&chars, i, line)?;
                tokens.push(Spanned {
                    token: Token::Str(text),
                    line,
                });
                line += lines;
                i = next;
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let (value, next) = lex_number(&chars, i, line)?;
                tokens.push(Spanned {
                    token: Token::Number(value),
                    line,
                });
                i = next;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Spanned {
                    token: Token::Ident(chars[start..i].iter().collect()),
                    line,
                });
                continue;
            }
            other => return Err(PlotError::UnexpectedChar { line, ch: other }),
        };

        tokens.push(Spanned { token, line });
        i += 1;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
    });
    Ok(tokens)
}

/// Lex a number starting at `start`. A `.` directly followed by another `.`
/// ends the number so that `0..5` reads as a range.
fn lex_number(chars: &[char], start: usize, line: usize) -> Result<(f64, usize), PlotError> {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' && chars.get(i + 1) != Some(&'.') {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }

    let text: String = chars[start..i].iter().collect();
    text.parse::<f64>()
        .map(|value| (value, i))
        .map_err(|_| PlotError::InvalidNumber { line, text })
}

/// Lex a quoted string; returns the text, the index after the closing quote
/// and the number of newlines consumed.
fn lex_string(
    chars: &[char],
    start: usize,
    line: usize,
) -> Result<(String, usize, usize), PlotError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut lines = 0;
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            c if c == quote => return Ok((text, i + 1, lines)),
            '\\' if i + 1 < chars.len() => {
                text.push(match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                i += 2;
            }
            '\n' => {
                lines += 1;
                text.push('\n');
                i += 1;
            }
            c => {
                text.push(c);
                i += 1;
            }
        }
    }

    Err(PlotError::UnterminatedString { line })
}
