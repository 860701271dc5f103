use crate::error::ExpressionError;
use std::fmt;

/// Maximum number of segments accepted in a single path.
pub const MAX_PATH_DEPTH: usize = 128;

/// One step of a dot/bracket path such as `customer.orders[0]["unit price"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Splits a path into its segments. An empty path addresses the root.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, ExpressionError> {
    let chars: Vec<char> = path.trim().chars().collect();
    let mut segments = Vec::new();
    let mut expect_segment = true;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if expect_segment {
                    return Err(invalid(path, "empty path segment"));
                }
                expect_segment = true;
                i += 1;
            }
            '[' => {
                let (segment, next) = parse_bracket(&chars, i + 1, path)?;
                segments.push(segment);
                expect_segment = false;
                i = next;
            }
            _ => {
                if !expect_segment {
                    return Err(invalid(path, "expected '.' or '[' between segments"));
                }
                let start = i;
                while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    i += 1;
                }
                let key: String = chars[start..i].iter().collect();
                let key = key.trim();
                if key.is_empty() {
                    return Err(invalid(path, "empty path segment"));
                }
                segments.push(PathSegment::Key(key.to_string()));
                expect_segment = false;
            }
        }

        if segments.len() > MAX_PATH_DEPTH {
            return Err(ExpressionError::DepthExceeded(MAX_PATH_DEPTH));
        }
    }

    if expect_segment && !segments.is_empty() {
        return Err(invalid(path, "path ends with '.'"));
    }
    Ok(segments)
}

/// Parses the inside of `[...]` starting right after the opening bracket.
/// Returns the segment and the index just past the closing bracket.
fn parse_bracket(
    chars: &[char],
    start: usize,
    path: &str,
) -> Result<(PathSegment, usize), ExpressionError> {
    let mut i = start;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }

    let segment = match chars.get(i) {
        Some(&quote) if quote == '"' || quote == '\'' => {
            let key_start = i + 1;
            let key_end = chars[key_start..]
                .iter()
                .position(|c| *c == quote)
                .map(|offset| key_start + offset)
                .ok_or_else(|| invalid(path, "unterminated quoted key"))?;
            i = key_end + 1;
            PathSegment::Key(chars[key_start..key_end].iter().collect())
        }
        Some(_) => {
            let digits_start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let digits: String = chars[digits_start..i].iter().collect();
            let index = digits
                .parse::<usize>()
                .map_err(|_| invalid(path, "bracket must hold an index or a quoted key"))?;
            PathSegment::Index(index)
        }
        None => return Err(invalid(path, "unterminated '['")),
    };

    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if chars.get(i) != Some(&']') {
        return Err(invalid(path, "expected ']'"));
    }
    Ok((segment, i + 1))
}

fn invalid(path: &str, message: &str) -> ExpressionError {
    ExpressionError::InvalidPath {
        path: path.to_string(),
        message: message.to_string(),
    }
}
