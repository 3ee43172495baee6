// ABOUTME: Tokenizer for AT reply lines (V.250 / 27.007 syntax) with typed, cursor-based extraction
// ABOUTME: Failures are sticky: after the first failed extraction every later call is a no-op

use std::ops::Range;
use thiserror::Error;
use tracing::debug;

/// Raised by [`AtParser::finish`] when any extraction in the chain failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Can't parse argument #{arg} in '{line}'")]
pub struct AtParseError {
    pub arg: usize,
    pub line: String,
}

/// A single reply line being taken apart argument by argument.
///
/// ```
/// use usbmodem::at::AtParser;
///
/// let mut mode = 0;
/// let mut oper = String::new();
/// let ok = AtParser::new("+COPS: 0,0,\"MegaFon\",7")
///     .parse_int(&mut mode)
///     .parse_skip()
///     .parse_string(&mut oper)
///     .success();
///
/// assert!(ok);
/// assert_eq!(mode, 0);
/// assert_eq!(oper, "MegaFon");
/// ```
#[derive(Debug, Clone)]
pub struct AtParser<'a> {
    source: &'a str,
    cursor: usize,
    /// A line boundary (end of input or newline) was reached; no argument
    /// is available until `parse_new_line` moves past it
    at_boundary: bool,
    arg_cnt: usize,
    success: bool,
    failed_arg: usize,
}

/// One token: content range plus the cursor position after its separator
struct Token {
    range: Range<usize>,
    next: usize,
    at_boundary: bool,
}

impl<'a> AtParser<'a> {
    pub fn new(line: &'a str) -> Self {
        let mut parser = Self {
            source: line,
            cursor: 0,
            at_boundary: false,
            arg_cnt: 0,
            success: true,
            failed_arg: 0,
        };
        parser.reset();
        parser
    }

    /// Start over on a new line
    pub fn parse(&mut self, line: &'a str) -> &mut Self {
        self.source = line;
        self.reset()
    }

    /// Rewind to the first argument and clear the failure flag
    pub fn reset(&mut self) -> &mut Self {
        self.cursor = skip_prefix(self.source);
        self.at_boundary = false;
        self.arg_cnt = 0;
        self.success = true;
        self.failed_arg = 0;
        self
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Number of arguments consumed so far
    pub fn arg_count(&self) -> usize {
        self.arg_cnt
    }

    /// The chain's outcome as a `Result`
    pub fn finish(&self) -> Result<(), AtParseError> {
        if self.success {
            Ok(())
        } else {
            Err(AtParseError {
                arg: self.failed_arg,
                line: self.source.to_string(),
            })
        }
    }

    pub fn parse_string(&mut self, value: &mut String) -> &mut Self {
        if let Some(v) = self.next_str() {
            *value = v.to_string();
        }
        self
    }

    pub fn parse_int(&mut self, value: &mut i32) -> &mut Self {
        self.parse_int_radix(value, 10)
    }

    pub fn parse_int_radix(&mut self, value: &mut i32, radix: u32) -> &mut Self {
        if let Some(v) = self.next_int_radix(radix) {
            *value = v;
        }
        self
    }

    pub fn parse_uint(&mut self, value: &mut u32) -> &mut Self {
        self.parse_uint_radix(value, 10)
    }

    pub fn parse_uint_radix(&mut self, value: &mut u32, radix: u32) -> &mut Self {
        if let Some(v) = self.next_uint_radix(radix) {
            *value = v;
        }
        self
    }

    pub fn parse_bool(&mut self, value: &mut bool) -> &mut Self {
        if let Some(v) = self.next_bool() {
            *value = v;
        }
        self
    }

    pub fn parse_array(&mut self, values: &mut Vec<String>) -> &mut Self {
        if let Some(v) = self.next_array() {
            values.extend(v);
        }
        self
    }

    pub fn parse_list(&mut self, values: &mut Vec<String>) -> &mut Self {
        if let Some(v) = self.next_list() {
            values.extend(v);
        }
        self
    }

    pub fn parse_new_line(&mut self) -> &mut Self {
        self.next_new_line();
        self
    }

    pub fn parse_skip(&mut self) -> &mut Self {
        self.next_str();
        self
    }

    /// Next argument, borrowed from the source line
    pub fn next_str(&mut self) -> Option<&'a str> {
        let source = self.source;
        let token = self.next_token()?;
        Some(&source[token])
    }

    pub fn next_string(&mut self) -> Option<String> {
        self.next_str().map(str::to_string)
    }

    pub fn next_int(&mut self) -> Option<i32> {
        self.next_int_radix(10)
    }

    pub fn next_int_radix(&mut self, radix: u32) -> Option<i32> {
        let token = self.next_str()?;
        let value = parse_numeric(token, radix, i32::from_str_radix);
        self.check(value)
    }

    pub fn next_uint(&mut self) -> Option<u32> {
        self.next_uint_radix(10)
    }

    pub fn next_uint_radix(&mut self, radix: u32) -> Option<u32> {
        let token = self.next_str()?;
        let value = parse_numeric(token, radix, u32::from_str_radix);
        self.check(value)
    }

    /// Only literal `0` and `1` are accepted
    pub fn next_bool(&mut self) -> Option<bool> {
        let value = match self.next_int()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        };
        self.check(value)
    }

    /// A quoted string whose contents are themselves a comma separated list
    pub fn next_array(&mut self) -> Option<Vec<String>> {
        let inner = self.next_str()?;
        let values = split_all(inner);
        self.check(values)
    }

    /// Every remaining argument up to the end of the line
    pub fn next_list(&mut self) -> Option<Vec<String>> {
        let mut values = vec![self.next_string()?];
        while !self.at_boundary {
            values.push(self.next_string()?);
        }
        Some(values)
    }

    /// Step over a literal newline embedded in a multi-line reply
    pub fn next_new_line(&mut self) -> Option<()> {
        if !self.success {
            return None;
        }
        self.arg_cnt += 1;

        let bytes = self.source.as_bytes();
        let pos = skip_spaces(bytes, self.cursor);
        if bytes.get(pos) == Some(&b'\n') {
            self.cursor = pos + 1;
            self.at_boundary = false;
            Some(())
        } else {
            self.fail();
            None
        }
    }

    /// Count the arguments `line` would yield, without a parser instance
    pub fn count_args(line: &str) -> usize {
        let start = skip_prefix(line);
        if line[start..].trim().is_empty() {
            return 0;
        }

        let mut count = 0;
        let mut cursor = start;
        while let Some(token) = scan_token(line.as_bytes(), cursor) {
            count += 1;
            if token.at_boundary {
                break;
            }
            cursor = token.next;
        }
        count
    }

    /// Drop a leading `+NAME:`, `*NAME:`, `^NAME:` or `!NAME:` header.
    ///
    /// Lines without a well-formed header are returned unchanged.
    pub fn strip_prefix(line: &str) -> &str {
        let bytes = line.as_bytes();
        if !matches!(bytes.first(), Some(b'+' | b'*' | b'^' | b'!')) {
            return line;
        }

        let Some(colon) = line.find(':') else {
            return line;
        };

        let name_ok = bytes[1..colon]
            .iter()
            .all(|c| c.is_ascii_alphanumeric() || *c == b'_');
        if !name_ok {
            return line;
        }

        line[colon + 1..].trim_start()
    }

    fn next_token(&mut self) -> Option<Range<usize>> {
        if !self.success {
            return None;
        }
        self.arg_cnt += 1;

        if self.at_boundary {
            self.fail();
            return None;
        }

        match scan_token(self.source.as_bytes(), self.cursor) {
            Some(token) => {
                self.cursor = token.next;
                self.at_boundary = token.at_boundary;
                Some(token.range)
            }
            None => {
                self.fail();
                None
            }
        }
    }

    fn check<T>(&mut self, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.fail();
        }
        value
    }

    fn fail(&mut self) {
        if self.success {
            debug!(
                "AtParser: can't parse argument #{} in '{}'",
                self.arg_cnt, self.source
            );
            self.success = false;
            self.failed_arg = self.arg_cnt;
        }
    }
}

/// Position right after the first `:`, or 0 when there is none
fn skip_prefix(line: &str) -> usize {
    line.find(':').map_or(0, |i| i + 1)
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() && bytes[pos] != b'\n' {
        pos += 1;
    }
    pos
}

/// After a closing quote or paren only a separator may follow
fn finish_token(bytes: &[u8], range: Range<usize>, after: usize) -> Option<Token> {
    let pos = skip_spaces(bytes, after);
    match bytes.get(pos) {
        None => Some(Token {
            range,
            next: pos,
            at_boundary: true,
        }),
        Some(b',') => Some(Token {
            range,
            next: pos + 1,
            at_boundary: false,
        }),
        Some(b'\n') => Some(Token {
            range,
            next: pos,
            at_boundary: true,
        }),
        Some(_) => None,
    }
}

fn scan_token(bytes: &[u8], cursor: usize) -> Option<Token> {
    let mut pos = skip_spaces(bytes, cursor);

    match bytes.get(pos) {
        Some(b'(') => {
            pos += 1;
            let start = pos;
            let mut level = 1;
            let mut in_quote = false;

            while let Some(&c) = bytes.get(pos) {
                if in_quote {
                    in_quote = c != b'"';
                } else if c == b'"' {
                    in_quote = true;
                } else if c == b'(' {
                    level += 1;
                } else if c == b')' {
                    level -= 1;
                    if level == 0 {
                        return finish_token(bytes, start..pos, pos + 1);
                    }
                }
                pos += 1;
            }
            None
        }
        Some(b'"') => {
            let start = pos + 1;
            let len = bytes[start..].iter().position(|&c| c == b'"')?;
            finish_token(bytes, start..start + len, start + len + 1)
        }
        _ => {
            let start = pos;
            while pos < bytes.len() && bytes[pos] != b',' && bytes[pos] != b'\n' {
                pos += 1;
            }
            let comma = bytes.get(pos) == Some(&b',');
            Some(Token {
                range: start..pos,
                next: if comma { pos + 1 } else { pos },
                at_boundary: !comma,
            })
        }
    }
}

/// Tokenize a whole string as one comma separated list
fn split_all(inner: &str) -> Option<Vec<String>> {
    let bytes = inner.as_bytes();
    if inner.trim().is_empty() {
        return Some(vec![String::new()]);
    }

    let mut values = Vec::new();

    let mut cursor = 0;
    loop {
        let token = scan_token(bytes, cursor)?;
        values.push(inner[token.range].to_string());
        if token.at_boundary {
            if token.next < bytes.len() {
                return None;
            }
            return Some(values);
        }
        cursor = token.next;
    }
}

/// Strict conversion of a whole token; surrounding whitespace is ignored
fn parse_numeric<T>(
    token: &str,
    radix: u32,
    from_str_radix: fn(&str, u32) -> Result<T, std::num::ParseIntError>,
) -> Option<T> {
    let mut digits = token.trim();
    if radix == 16 {
        digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
    }
    from_str_radix(digits, radix).ok()
}
