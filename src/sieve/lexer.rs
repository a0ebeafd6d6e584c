/// SIEVE script tokenizer (RFC 5228).
///
/// Works on raw bytes so that string literals reach the compiler exactly as
/// they were written; UTF-8 checking is the validators' job.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A `:tag` like `:is`, `:contains`, `:over`, `:domain`, etc. Lower-cased.
    Tag(String),
    /// An unquoted identifier like `if`, `header`, `allof`, `fileinto`, etc.
    Identifier(String),
    /// A double-quoted string with escapes removed.
    QuotedString(Vec<u8>),
    /// A multi-line string `text:\r\n...\r\n.\r\n`, one part per line with
    /// dot-stuffing removed. The parts concatenate to the string value.
    MultiLineString(Vec<Vec<u8>>),
    /// A number with any K/M/G multiplier applied.
    Number(u64),
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub token: Token,
    pub line: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated string starting on line {line}")]
    UnterminatedString { line: usize },
    #[error("unterminated multi-line string starting on line {line}")]
    UnterminatedMultiLine { line: usize },
    #[error("unterminated block comment starting on line {line}")]
    UnterminatedComment { line: usize },
    #[error("unexpected character '{ch}' on line {line}")]
    UnexpectedCharacter { ch: char, line: usize },
    #[error("number '{text}' on line {line} is too large")]
    NumberOverflow { text: String, line: usize },
}

/// Anything that can feed tokens to the parser.
pub trait TokenSource {
    /// Returns the next token, or `None` once the input is exhausted.
    fn next_token(&mut self) -> Result<Option<Span>, LexError>;
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn peek_at(&self, i: usize) -> Option<u8> {
        self.input.get(i).copied()
    }

    fn span(&self, token: Token, line: usize, offset: usize) -> Option<Span> {
        Some(Span {
            token,
            line,
            offset,
        })
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        let bytes = self.input;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'#' => {
                    while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek_at(self.pos + 1) == Some(b'*') => {
                    let start_line = self.line;
                    self.pos += 2;
                    loop {
                        if self.pos + 1 >= bytes.len() {
                            return Err(LexError::UnterminatedComment { line: start_line });
                        }
                        if bytes[self.pos] == b'*' && bytes[self.pos + 1] == b'/' {
                            self.pos += 2;
                            break;
                        }
                        if bytes[self.pos] == b'\n' {
                            self.line += 1;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn quoted_string(&mut self) -> Result<Token, LexError> {
        let bytes = self.input;
        let start_line = self.line;
        self.pos += 1;
        let mut s = Vec::new();
        loop {
            let Some(&b) = bytes.get(self.pos) else {
                return Err(LexError::UnterminatedString { line: start_line });
            };
            match b {
                b'\\' if self.pos + 1 < bytes.len() => {
                    let escaped = bytes[self.pos + 1];
                    if escaped == b'\n' {
                        self.line += 1;
                    }
                    s.push(escaped);
                    self.pos += 2;
                }
                b'"' => {
                    self.pos += 1;
                    return Ok(Token::QuotedString(s));
                }
                _ => {
                    if b == b'\n' {
                        self.line += 1;
                    }
                    s.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    fn multi_line_string(&mut self) -> Result<Token, LexError> {
        let bytes = self.input;
        let start_line = self.line;
        self.pos += 5; // "text:"

        // Only whitespace or a hash comment may follow "text:" on its line.
        while self.pos < bytes.len() && matches!(bytes[self.pos], b' ' | b'\t' | b'\r') {
            self.pos += 1;
        }
        if self.peek_at(self.pos) == Some(b'#') {
            while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                self.pos += 1;
            }
        }
        match self.peek_at(self.pos) {
            Some(b'\n') => {
                self.pos += 1;
                self.line += 1;
            }
            Some(other) => {
                return Err(LexError::UnexpectedCharacter {
                    ch: other as char,
                    line: self.line,
                })
            }
            None => return Err(LexError::UnterminatedMultiLine { line: start_line }),
        }

        let mut parts = Vec::new();
        loop {
            if self.pos >= bytes.len() {
                return Err(LexError::UnterminatedMultiLine { line: start_line });
            }
            let line_start = self.pos;
            while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                self.pos += 1;
            }
            let has_newline = self.pos < bytes.len();
            if has_newline {
                self.pos += 1;
                self.line += 1;
            }
            let line = &bytes[line_start..self.pos];

            let content = line
                .strip_suffix(b"\n")
                .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
                .unwrap_or(line);
            if content == b"." {
                return Ok(Token::MultiLineString(parts));
            }
            if !has_newline {
                return Err(LexError::UnterminatedMultiLine { line: start_line });
            }
            let unstuffed = if line.starts_with(b"..") {
                &line[1..]
            } else {
                line
            };
            parts.push(unstuffed.to_vec());
        }
    }

    fn number(&mut self) -> Result<Token, LexError> {
        let bytes = self.input;
        let start = self.pos;
        let mut value: u64 = 0;
        let mut overflow = false;
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
            let digit = u64::from(bytes[self.pos] - b'0');
            match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => value = v,
                None => overflow = true,
            }
            self.pos += 1;
        }
        // Optional K/M/G suffix
        let multiplier: u64 = match self.peek_at(self.pos) {
            Some(b'K' | b'k') => 1 << 10,
            Some(b'M' | b'm') => 1 << 20,
            Some(b'G' | b'g') => 1 << 30,
            _ => 1,
        };
        if multiplier != 1 {
            self.pos += 1;
        }
        match value.checked_mul(multiplier) {
            Some(v) if !overflow => Ok(Token::Number(v)),
            _ => Err(LexError::NumberOverflow {
                text: String::from_utf8_lossy(&bytes[start..self.pos]).into_owned(),
                line: self.line,
            }),
        }
    }

    fn word(&mut self) -> String {
        let bytes = self.input;
        let start = self.pos;
        while self.pos < bytes.len() && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        String::from_utf8_lossy(&bytes[start..self.pos]).into_owned()
    }
}

impl TokenSource for Lexer<'_> {
    fn next_token(&mut self) -> Result<Option<Span>, LexError> {
        self.skip_trivia()?;

        let bytes = self.input;
        let Some(&b) = bytes.get(self.pos) else {
            return Ok(None);
        };
        let start = self.pos;
        let line = self.line;

        let punct = match b {
            b';' => Some(Token::Semicolon),
            b',' => Some(Token::Comma),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = punct {
            self.pos += 1;
            return Ok(self.span(token, line, start));
        }

        let token = match b {
            b'"' => self.quoted_string()?,

            // Multi-line string: text:
            b't' | b'T'
                if bytes.len() >= self.pos + 5
                    && bytes[self.pos..self.pos + 5].eq_ignore_ascii_case(b"text:") =>
            {
                self.multi_line_string()?
            }

            // Tag: :identifier
            b':' => {
                self.pos += 1;
                match self.peek_at(self.pos) {
                    Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                        Token::Tag(format!(":{}", self.word().to_ascii_lowercase()))
                    }
                    _ => return Err(LexError::UnexpectedCharacter { ch: ':', line }),
                }
            }

            b'0'..=b'9' => self.number()?,

            _ if b.is_ascii_alphabetic() || b == b'_' => Token::Identifier(self.word()),

            _ => {
                return Err(LexError::UnexpectedCharacter {
                    ch: b as char,
                    line,
                })
            }
        };

        Ok(self.span(token, line, start))
    }
}

/// Tokenizes a whole script at once.
pub fn tokenize(input: &[u8]) -> Result<Vec<Span>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(span) = lexer.next_token()? {
        tokens.push(span);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let tokens = tokenize(b"require \"fileinto\";").unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0].token, Token::Identifier(s) if s == "require"));
        assert!(matches!(&tokens[1].token, Token::QuotedString(s) if s == b"fileinto"));
        assert!(matches!(&tokens[2].token, Token::Semicolon));
    }

    #[test]
    fn test_tags_and_strings() {
        let tokens = tokenize(b"header :Contains \"Subject\" \"SPAM\"").unwrap();
        assert_eq!(tokens.len(), 4);
        assert!(matches!(&tokens[1].token, Token::Tag(s) if s == ":contains"));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize(b"# Filter: test\n/* block\ncomment */ keep;").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_string_list() {
        let tokens = tokenize(b"[\"a\", \"b\"]").unwrap();
        assert_eq!(tokens.len(), 5); // [ "a" , "b" ]
    }

    #[test]
    fn test_number_with_suffix() {
        let tokens = tokenize(b"100K 2m 7").unwrap();
        assert_eq!(tokens[0].token, Token::Number(100 * 1024));
        assert_eq!(tokens[1].token, Token::Number(2 * 1024 * 1024));
        assert_eq!(tokens[2].token, Token::Number(7));
    }

    #[test]
    fn test_number_overflow() {
        let err = tokenize(b"99999999999999999999G").unwrap_err();
        assert!(matches!(err, LexError::NumberOverflow { .. }));
    }

    #[test]
    fn test_escapes() {
        let tokens = tokenize(br#""say \"hi\" \\ now""#).unwrap();
        assert_eq!(tokens[0].token, Token::QuotedString(br#"say "hi" \ now"#.to_vec()));
    }

    #[test]
    fn test_multi_line_string() {
        let input = b"vacation text:\r\nI am away.\r\n..dotted\r\n.\r\n;";
        let tokens = tokenize(input).unwrap();
        assert_eq!(tokens.len(), 3);
        match &tokens[1].token {
            Token::MultiLineString(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0], b"I am away.\r\n");
                assert_eq!(parts[1], b".dotted\r\n");
            }
            other => panic!("Expected MultiLineString, got {other:?}"),
        }
        assert_eq!(tokens[2].line, 5);
    }

    #[test]
    fn test_unterminated_multi_line() {
        let err = tokenize(b"text:\nno terminator\n").unwrap_err();
        assert_eq!(err, LexError::UnterminatedMultiLine { line: 1 });
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            tokenize(b"\"open").unwrap_err(),
            LexError::UnterminatedString { line: 1 }
        );
        assert_eq!(
            tokenize(b"keep;\n@").unwrap_err(),
            LexError::UnexpectedCharacter { ch: '@', line: 2 }
        );
        assert!(matches!(
            tokenize(b"/* never closed").unwrap_err(),
            LexError::UnterminatedComment { .. }
        ));
    }
}
