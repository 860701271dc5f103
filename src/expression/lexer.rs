use crate::error::ExpressionError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Identifier(String),
    Hash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Question,
    Operator(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "{:?}", s),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Hash => write!(f, "#"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
            Token::Operator(op) => write!(f, "{}", op),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

const TWO_CHAR_OPERATORS: [&str; 7] = ["==", "!=", "<=", ">=", "&&", "||", "??"];
const ONE_CHAR_OPERATORS: [&str; 9] = ["+", "-", "*", "/", "%", "^", "<", ">", "!"];

/// Splits an expression into tokens, remembering the character offset of each.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let offset = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let token = if c.is_ascii_digit() {
            let (number, next) = read_number(&chars, i);
            i = next;
            Token::Number(number)
        } else if c == '"' || c == '\'' || c == '`' {
            let (text, next) = read_string(&chars, i)?;
            i = next;
            Token::Str(text)
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            Token::Identifier(chars[start..i].iter().collect())
        } else if let Some(op) = match_operator(&chars, i) {
            i += op.chars().count();
            Token::Operator(op)
        } else {
            i += 1;
            match c {
                '#' => Token::Hash,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                ',' => Token::Comma,
                '.' => Token::Dot,
                ':' => Token::Colon,
                '?' => Token::Question,
                other => {
                    return Err(ExpressionError::UnexpectedCharacter {
                        character: other,
                        offset,
                    });
                }
            }
        };

        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

fn match_operator(chars: &[char], i: usize) -> Option<&'static str> {
    let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
    if let Some(op) = TWO_CHAR_OPERATORS.iter().copied().find(|op| *op == two) {
        return Some(op);
    }
    let one = chars[i].to_string();
    ONE_CHAR_OPERATORS.iter().copied().find(|op| *op == one)
}

fn read_number(chars: &[char], start: usize) -> (f64, usize) {
    let mut i = start;
    let mut text = String::new();
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
        if chars[i] != '_' {
            text.push(chars[i]);
        }
        i += 1;
    }

    // A dot only belongs to the number when a digit follows it (`1.5`, not `a[1].b`).
    if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        text.push('.');
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            text.push(chars[i]);
            i += 1;
        }
    }

    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            text.extend(&chars[i..j]);
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                text.push(chars[i]);
                i += 1;
            }
        }
    }

    (text.parse().unwrap_or(0.0), i)
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize), ExpressionError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                text.push(match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Ok((text, i + 1)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }

    Err(ExpressionError::UnexpectedEnd(format!("closing {}", quote)))
}
