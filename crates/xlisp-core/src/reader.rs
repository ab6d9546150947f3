use crate::ast::{Value, Vector};
use crate::error::XlispError;

#[derive(Clone, Debug, Default)]
pub struct ReaderOptions {
    pub source_name: Option<String>,
}

pub struct Reader {
    chars: Vec<char>,
    index: usize,
    line: usize,
    col: usize,
    pub options: ReaderOptions,
}

fn is_ws_or_comma(ch: char) -> bool {
    ch.is_whitespace() || ch == ','
}

fn is_delim(ch: char) -> bool {
    is_ws_or_comma(ch) || matches!(ch, '(' | ')' | '[' | ']' | '"' | ';')
}

impl Reader {
    pub fn new(source: &str) -> Self {
        Self::new_with_options(source, ReaderOptions::default())
    }

    pub fn new_with_options(source: &str, options: ReaderOptions) -> Self {
        let mut reader = Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            col: 1,
            options,
        };
        reader.skip_shebang();
        reader
    }

    pub fn read_all(&mut self) -> Result<Vec<Value>, XlispError> {
        let mut forms = Vec::new();
        self.skip_ws_and_comments();
        while !self.eof() {
            forms.push(self.read_form()?);
            self.skip_ws_and_comments();
        }
        Ok(forms)
    }

    fn read_form(&mut self) -> Result<Value, XlispError> {
        self.skip_ws_and_comments();
        if self.eof() {
            return self.parse_err("unexpected end of input");
        }
        match self.current_char() {
            '\'' => self.read_prefixed("quote"),
            '@' => self.read_prefixed("deref"),
            '(' => self.read_seq(')').map(Value::List),
            '[' => self.read_seq(']').map(Value::Vector),
            ')' | ']' => self.parse_err(format!("unexpected '{}'", self.current_char())),
            '"' => self.read_string(),
            ':' => self.read_keyword(),
            _ => self.read_atom(),
        }
    }

    fn read_prefixed(&mut self, head: &str) -> Result<Value, XlispError> {
        self.advance();
        let inner = self.read_form()?;
        Ok(Value::list(vec![Value::symbol(head), inner]))
    }

    fn read_seq(&mut self, close: char) -> Result<Vector<Value>, XlispError> {
        self.advance();
        let mut items = Vector::new();
        loop {
            self.skip_ws_and_comments();
            if self.eof() {
                return self.parse_err(format!("unterminated collection, expected '{}'", close));
            }
            let ch = self.current_char();
            if ch == close {
                self.advance();
                return Ok(items);
            }
            if matches!(ch, ')' | ']') {
                return self.parse_err(format!("expected '{}' but found '{}'", close, ch));
            }
            items.push_back(self.read_form()?);
        }
    }

    fn read_string(&mut self) -> Result<Value, XlispError> {
        self.advance(); // "
        let mut buf = String::new();
        while !self.eof() {
            let ch = self.current_char();
            match ch {
                '"' => {
                    self.advance();
                    return Ok(Value::String(buf));
                }
                '\\' => {
                    self.advance();
                    if self.eof() {
                        return self.parse_err("unterminated escape");
                    }
                    let esc = self.current_char();
                    let real = match esc {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '"' => '"',
                        '\\' => '\\',
                        _ => esc,
                    };
                    buf.push(real);
                    self.advance();
                }
                _ => {
                    buf.push(ch);
                    self.advance();
                }
            }
        }
        self.parse_err("unterminated string")
    }

    fn read_keyword(&mut self) -> Result<Value, XlispError> {
        self.advance(); // :
        let name = self.read_token();
        if name.is_empty() {
            return self.parse_err("empty keyword");
        }
        Ok(Value::Keyword(name))
    }

    fn read_token(&mut self) -> String {
        let mut buf = String::new();
        while !self.eof() && !is_delim(self.current_char()) {
            buf.push(self.current_char());
            self.advance();
        }
        buf
    }

    fn read_atom(&mut self) -> Result<Value, XlispError> {
        let buf = self.read_token();
        match buf.as_str() {
            "nil" => return Ok(Value::Nil),
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            _ => {}
        }
        let numeric_start = buf
            .trim_start_matches(['-', '+'])
            .starts_with(|c: char| c.is_ascii_digit());
        if numeric_start {
            if let Ok(n) = buf.parse::<i64>() {
                return Ok(Value::Int(n));
            }
            if let Ok(n) = buf.parse::<f64>() {
                return Ok(Value::Float(n));
            }
            return self.parse_err(format!("invalid number literal '{}'", buf));
        }
        Ok(Value::Symbol(buf))
    }

    fn skip_shebang(&mut self) {
        if self.chars.starts_with(&['#', '!']) {
            while !self.eof() && self.current_char() != '\n' {
                self.advance();
            }
        }
    }

    pub fn skip_ws_and_comments(&mut self) {
        loop {
            while !self.eof() && is_ws_or_comma(self.current_char()) {
                self.advance();
            }
            if self.eof() || self.current_char() != ';' {
                break;
            }
            while !self.eof() && self.current_char() != '\n' {
                self.advance();
            }
        }
    }

    fn eof(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn current_char(&self) -> char {
        self.chars[self.index]
    }

    fn advance(&mut self) {
        if self.eof() {
            return;
        }
        if self.chars[self.index] == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.index += 1;
    }

    pub fn parse_err<T>(&self, msg: impl Into<String>) -> Result<T, XlispError> {
        let file_label = self.options.source_name.as_deref().unwrap_or("unknown");
        Err(XlispError::parse(format!(
            "{}:{}:{} {}",
            file_label,
            self.line,
            self.col,
            msg.into()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(src: &str) -> Value {
        let mut forms = Reader::new(src).read_all().unwrap();
        assert_eq!(forms.len(), 1);
        forms.remove(0)
    }

    #[test]
    fn reads_nested_forms() {
        let form = read_one("(loop [a 0, b 1] (if (< a 3) (recur b (+ a b)) a))");
        assert_eq!(
            form.to_string(),
            "(loop [a 0 b 1] (if (< a 3) (recur b (+ a b)) a))"
        );
    }

    #[test]
    fn reads_numbers_and_arrows() {
        let forms = Reader::new("-3 1.5 -> ->> - +1").read_all().unwrap();
        assert_eq!(forms[0], Value::Int(-3));
        assert_eq!(forms[1], Value::Float(1.5));
        assert_eq!(forms[2], Value::symbol("->"));
        assert_eq!(forms[3], Value::symbol("->>"));
        assert_eq!(forms[4], Value::symbol("-"));
        assert_eq!(forms[5], Value::Int(1));
    }

    #[test]
    fn quote_and_deref_sugar() {
        assert_eq!(read_one("'x").to_string(), "(quote x)");
        assert_eq!(read_one("@f").to_string(), "(deref f)");
    }

    #[test]
    fn skips_shebang_and_comments() {
        let forms = Reader::new("#!/usr/bin/env xlisp\n; note\n:k \"a\\nb\"")
            .read_all()
            .unwrap();
        assert_eq!(forms, vec![Value::Keyword("k".into()), Value::String("a\nb".into())]);
    }

    #[test]
    fn reports_position_of_unterminated_list() {
        let mut reader = Reader::new_with_options(
            "(+ 1\n 2",
            ReaderOptions {
                source_name: Some("demo.xl".into()),
            },
        );
        let err = reader.read_all().unwrap_err();
        assert!(err.to_string().starts_with("Parse error: demo.xl:2:3"));
    }
}
