use crate::frontend::token::Location;
use crate::frontend::token::Token;
use crate::frontend::token::TokenKind;
use anyhow::Result;

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 0,
            column: 0,
        }
    }
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }
    fn peek(&self) -> char {
        self.peek_n(0)
    }
    fn peek_next(&self) -> char {
        self.peek_n(1)
    }
    fn peek_n(&self, n: usize) -> char {
        match self.source.get(self.current + n) {
            Some(c) => *c,
            None => '\0',
        }
    }
    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }
    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = if kind == TokenKind::Eof {
            "".to_string()
        } else {
            self.lexeme()
        };
        let column = self.column - lexeme.chars().count();
        let location = Location::new(self.line, column, self.start);
        self.tokens.push(Token::new(kind, lexeme, location));
    }
    fn digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
    }
    fn number(&mut self) {
        self.digits();
        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            self.digits();
        }
        // Exponent such as `1e-3` or `2.5E+10`.
        if self.peek() == 'e' || self.peek() == 'E' {
            let signed = (self.peek_next() == '-' || self.peek_next() == '+')
                && self.peek_n(2).is_ascii_digit();
            if signed || self.peek_next().is_ascii_digit() {
                is_float = true;
                self.advance();
                if signed {
                    self.advance();
                }
                self.digits();
            }
        }
        if is_float {
            self.add_token(TokenKind::FloatLiteral);
        } else {
            self.add_token(TokenKind::Integer)
        }
    }
    // Whether the character is a valid identifier start character.
    fn is_identifier_start(c: char) -> bool {
        c.is_alphabetic() || c == '_' || c == '@' || c == '%'
    }
    // Whether the character is a valid identifier character.
    fn is_identifier(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '.' || c == '$'
    }
    fn is_int_type(word: &str) -> bool {
        let bits = word
            .strip_prefix("si")
            .or_else(|| word.strip_prefix("ui"))
            .or_else(|| word.strip_prefix('i'));
        match bits {
            Some(bits) => !bits.is_empty() && bits.chars().all(|c| c.is_ascii_digit()),
            None => false,
        }
    }
    // Scan identifiers and keywords.
    fn identifier(&mut self) {
        while Scanner::is_identifier(self.peek()) {
            self.advance();
        }
        let lexeme = self.lexeme();
        let kind = match lexeme.as_str() {
            s if s.starts_with('@') => TokenKind::AtIdentifier,
            s if s.starts_with('%') => TokenKind::PercentIdentifier,
            s if Scanner::is_int_type(s) => TokenKind::IntType,
            _ => TokenKind::BareIdentifier,
        };
        self.add_token(kind);
    }
    fn arrow_or_minus(&mut self) {
        if self.peek() == '>' {
            self.advance();
            self.add_token(TokenKind::Arrow);
        } else {
            self.add_token(TokenKind::Minus);
        }
    }
    fn string(&mut self) -> Result<()> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                break;
            }
            self.advance();
        }
        if self.peek() != '"' {
            return Err(self.scan_error("Unterminated string"));
        }
        self.advance();
        self.add_token(TokenKind::String);
        Ok(())
    }
    fn comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }
    fn scan_error(&self, msg: &str) -> anyhow::Error {
        let column = self.column.saturating_sub(1);
        let location = Location::new(self.line, column, self.start);
        let src = self.source.iter().collect::<String>();
        anyhow::anyhow!(format!("\n\n{}\n", Self::error(&src, &location, msg)))
    }
    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LParen),
            ')' => self.add_token(TokenKind::RParen),
            '{' => self.add_token(TokenKind::LBrace),
            '}' => self.add_token(TokenKind::RBrace),
            '[' => self.add_token(TokenKind::LBracket),
            ']' => self.add_token(TokenKind::RBracket),
            ':' => self.add_token(TokenKind::Colon),
            ',' => self.add_token(TokenKind::Comma),
            '=' => self.add_token(TokenKind::Equal),
            '!' => self.add_token(TokenKind::Exclamation),
            '?' => self.add_token(TokenKind::Question),
            '>' => self.add_token(TokenKind::Greater),
            '<' => self.add_token(TokenKind::Less),
            ' ' | '\r' | '\t' => (),
            '\n' => {
                self.line += 1;
                self.column = 0;
            }
            '/' if self.peek() == '/' => self.comment(),
            '-' => self.arrow_or_minus(),
            '"' => self.string()?,
            s if s.is_ascii_digit() => self.number(),
            s if Scanner::is_identifier_start(s) => self.identifier(),
            _ => {
                return Err(self.scan_error(&format!("Scanning failed starting at: {c}")));
            }
        }
        Ok(())
    }
    fn scan_tokens(&mut self) -> Result<()> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.start = self.current;
        self.add_token(TokenKind::Eof);
        Ok(())
    }
    pub fn scan(src: &str) -> Result<Vec<Token>> {
        let mut scanner = Scanner::new(src);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }
    /// Render `msg` below the line that `loc` points to.
    pub fn error(src: &str, loc: &Location, msg: &str) -> String {
        let lines = src.split('\n').collect::<Vec<&str>>();
        let n = loc.line();
        let prev_line = if n > 0 {
            let prev_n = n - 1;
            let prev = lines.get(prev_n).copied().unwrap_or("");
            format!("\n{prev_n}  | {prev}")
        } else {
            "".to_string()
        };
        let line = lines.get(n).copied().unwrap_or("");
        let line_num_width = 4 + n.to_string().len();
        let err_indent = " ".repeat(loc.column() + line_num_width);
        format!("```{prev_line}\n{n}  | {line}\n{err_indent}^ {msg}\n```")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_token(source: &str) -> Result<Token> {
        let tokens = Scanner::scan(source)?;
        Ok(tokens.first().unwrap().clone())
    }

    #[test]
    fn test_numbers() {
        let token = scan_token("42.5").unwrap();
        assert_eq!(token.kind, TokenKind::FloatLiteral);
        assert_eq!(token.lexeme, "42.5");
        assert_eq!(token.location.line(), 0);
        assert_eq!(token.location.column(), 0);
        let token = scan_token("42").unwrap();
        assert_eq!(token.kind, TokenKind::Integer);
        assert_eq!(token.lexeme, "42");
        let token = scan_token("1.5e-3").unwrap();
        assert_eq!(token.kind, TokenKind::FloatLiteral);
        assert_eq!(token.lexeme, "1.5e-3");
        let token = scan_token("2E10").unwrap();
        assert_eq!(token.kind, TokenKind::FloatLiteral);

        let tokens = Scanner::scan("42.5 42").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Integer);
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tensor_type() {
        let tokens = Scanner::scan("tensor<2x?xf32>").unwrap();
        let kinds = tokens.iter().map(|t| t.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                TokenKind::BareIdentifier,
                TokenKind::Less,
                TokenKind::Integer,
                TokenKind::BareIdentifier,
                TokenKind::Question,
                TokenKind::BareIdentifier,
                TokenKind::Greater,
                TokenKind::Eof,
            ]
        );
        let text = tokens.iter().map(|t| t.lexeme.clone()).collect::<String>();
        assert_eq!(text, "tensor<2x?xf32>");
    }

    #[test]
    fn test_quant_type() {
        let tokens = Scanner::scan("!quant.uniform<i8<-127:127>:f32, 1.0e-2:-3>").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Exclamation);
        assert_eq!(tokens[1].lexeme, "quant.uniform");
        assert_eq!(tokens[3].kind, TokenKind::IntType);
        assert_eq!(tokens[3].lexeme, "i8");
        assert_eq!(tokens[5].kind, TokenKind::Minus);
        let text = tokens.iter().map(|t| t.lexeme.clone()).collect::<String>();
        assert_eq!(text, "!quant.uniform<i8<-127:127>:f32,1.0e-2:-3>");
    }

    #[test]
    fn test_ops() {
        let src = "%1 = quant.qcast %0 : f32 to ui8 // comment\nreturn";
        let tokens = Scanner::scan(src).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::PercentIdentifier);
        assert_eq!(tokens[1].kind, TokenKind::Equal);
        assert_eq!(tokens[2].lexeme, "quant.qcast");
        assert_eq!(tokens[6].kind, TokenKind::BareIdentifier);
        assert_eq!(tokens[6].lexeme, "to");
        assert_eq!(tokens[7].kind, TokenKind::IntType);
        assert_eq!(tokens[8].lexeme, "return");
        assert_eq!(tokens[8].location.line(), 1);
        assert_eq!(tokens[9].kind, TokenKind::Eof);

        let tokens = Scanner::scan("func.func @main() -> f32").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::AtIdentifier);
        assert_eq!(tokens[4].kind, TokenKind::Arrow);
    }

    #[test]
    fn test_error() {
        let src = "module {\n  %1 = arith.constant 1.0 : f32\n}";
        let tokens = Scanner::scan(src).unwrap();
        assert_eq!(tokens[4].lexeme, "arith.constant");
        assert_eq!(tokens[4].location.line(), 1);
        assert_eq!(tokens[4].location.column(), 7);

        let text = Scanner::error(src, &tokens[4].location, "test");
        let lines = text.split('\n').collect::<Vec<&str>>();
        assert_eq!(lines[0], "```");
        assert_eq!(lines[1], "0  | module {");
        assert_eq!(lines[2], "1  |   %1 = arith.constant 1.0 : f32");
        assert_eq!(lines[3], "            ^ test");
        assert_eq!(lines[4], "```");

        let err = Scanner::scan("module {\n  #\n}").unwrap_err();
        assert!(err.to_string().contains("Scanning failed starting at: #"));
        assert!(Scanner::scan("\"open").is_err());
    }
}
