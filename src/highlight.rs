//! Python syntax highlighting.
//!
//! [`tokenize`] splits Python source into a flat list of typed tokens;
//! f-string interpolations are tokenized recursively into the same list.
//! [`HighlightTheme`] maps token types to HTML classes. Types without a class
//! of their own use their parent's.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::render::push_escaped;

/// Errors raised while configuring a theme.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HighlightError {
    #[error("unknown token type: {name:?}")]
    UnknownTokenType { name: String },

    #[error("invalid html class: {class:?}")]
    InvalidClass { class: String },
}

macro_rules! token_types {
    ($($variant:ident => $name:literal, $parent:expr;)*) => {
        /// Node of the token type hierarchy.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum TokenType {
            $($variant,)*
        }

        impl TokenType {
            pub const ALL: &'static [TokenType] = &[$(TokenType::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(TokenType::$variant => $name,)*
                }
            }

            /// Parent node; `None` only for [`TokenType::Any`].
            pub fn parent(self) -> Option<TokenType> {
                match self {
                    $(TokenType::$variant => $parent,)*
                }
            }
        }
    };
}

token_types! {
    Any => "any", None;
    Space => "space", Some(TokenType::Any);
    Linebreak => "linebreak", Some(TokenType::Any);
    Comment => "comment", Some(TokenType::Any);
    Unidentified => "unidentified", Some(TokenType::Any);
    Constant => "constant", Some(TokenType::Any);
    Number => "number", Some(TokenType::Constant);
    String => "string", Some(TokenType::Constant);
    FormatString => "format_string", Some(TokenType::String);
    BuiltinConstant => "builtin_constant", Some(TokenType::Constant);
    Identifier => "identifier", Some(TokenType::Any);
    Keyword => "keyword", Some(TokenType::Identifier);
    Builtin => "builtin", Some(TokenType::Identifier);
    MagicName => "magic_name", Some(TokenType::Identifier);
    Attribute => "attribute", Some(TokenType::Identifier);
    Variable => "variable", Some(TokenType::Identifier);
    Syntax => "syntax", Some(TokenType::Any);
    Operator => "operator", Some(TokenType::Syntax);
    Punctuation => "punctuation", Some(TokenType::Syntax);
}

impl TokenType {
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenType {
    type Err = HighlightError;

    /// Accepts `string`, `STRING` and `TOKEN_TYPE_STRING`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let name = lowered.strip_prefix("token_type_").unwrap_or(&lowered);
        TokenType::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| HighlightError::UnknownTokenType {
                name: value.to_string(),
            })
    }
}

/// A typed slice of source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenType,
    pub text: String,
}

impl Token {
    fn new(kind: TokenType, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// HTML classes per token type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightTheme {
    classes: Vec<Option<String>>,
}

impl Default for HighlightTheme {
    fn default() -> Self {
        let mut theme = Self::empty();
        for (kind, class) in [
            (TokenType::Comment, "comment"),
            (TokenType::Unidentified, "unidentified"),
            (TokenType::Constant, "constant"),
            (TokenType::Keyword, "keyword"),
            (TokenType::Builtin, "builtin"),
            (TokenType::MagicName, "magic"),
            (TokenType::Attribute, "attribute"),
            (TokenType::Operator, "operator"),
            (TokenType::Punctuation, "punctuation"),
        ] {
            theme.classes[kind.index()] = Some(class.to_string());
        }
        theme
    }
}

impl HighlightTheme {
    /// A theme without any class.
    pub fn empty() -> Self {
        Self {
            classes: vec![None; TokenType::ALL.len()],
        }
    }

    /// Set or clear the class of `kind`.
    pub fn set_html_class(
        &mut self,
        kind: TokenType,
        class: Option<&str>,
    ) -> Result<(), HighlightError> {
        if let Some(class) = class {
            validate_class(class)?;
        }
        self.classes[kind.index()] = class.map(str::to_string);
        Ok(())
    }

    /// [`HighlightTheme::set_html_class`] with the token type given by name.
    pub fn set_html_class_by_name(
        &mut self,
        name: &str,
        class: Option<&str>,
    ) -> Result<(), HighlightError> {
        let kind = name.parse()?;
        self.set_html_class(kind, class)
    }

    /// Class of `kind`, inherited from the closest ancestor with one.
    pub fn html_class(&self, kind: TokenType) -> Option<&str> {
        let mut current = Some(kind);
        while let Some(kind) = current {
            if let Some(class) = &self.classes[kind.index()] {
                return Some(class);
            }
            current = kind.parent();
        }
        None
    }

    /// Render tokens as HTML spans into `output`.
    pub fn render(&self, tokens: &[Token], output: &mut String) {
        for token in tokens {
            match self.html_class(token.kind) {
                Some(class) if !matches!(token.kind, TokenType::Space | TokenType::Linebreak) => {
                    output.push_str("<span class=\"");
                    output.push_str(class);
                    output.push_str("\">");
                    push_escaped(output, &token.text);
                    output.push_str("</span>");
                }
                _ => push_escaped(output, &token.text),
            }
        }
    }

    /// Tokenize and render `source`.
    pub fn highlight(&self, source: &str) -> String {
        let mut output = String::with_capacity(source.len() * 2);
        self.render(&tokenize(source), &mut output);
        output
    }
}

fn validate_class(class: &str) -> Result<(), HighlightError> {
    let valid = !class.trim().is_empty()
        && class.split_whitespace().all(|piece| {
            let mut chars = piece.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });
    if valid {
        Ok(())
    } else {
        Err(HighlightError::InvalidClass {
            class: class.to_string(),
        })
    }
}

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

const BUILTIN_CONSTANTS: &[&str] = &[
    "True", "False", "None", "Ellipsis", "NotImplemented", "__debug__",
];

const BUILTINS: &[&str] = &[
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint", "bytearray",
    "bytes", "callable", "chr", "classmethod", "compile", "complex", "delattr", "dict", "dir",
    "divmod", "enumerate", "eval", "exec", "filter", "float", "format", "frozenset", "getattr",
    "globals", "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance",
    "issubclass", "iter", "len", "list", "locals", "map", "max", "memoryview", "min", "next",
    "object", "oct", "open", "ord", "pow", "print", "property", "range", "repr", "reversed",
    "round", "set", "setattr", "slice", "sorted", "staticmethod", "str", "sum", "super",
    "tuple", "type", "vars", "zip", "self", "cls", "BaseException", "Exception",
    "ArithmeticError", "AssertionError", "AttributeError", "ImportError", "IndexError",
    "KeyError", "LookupError", "NameError", "NotImplementedError", "OSError", "RuntimeError",
    "StopIteration", "StopAsyncIteration", "TypeError", "ValueError", "ZeroDivisionError",
];

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "->", ":=", "**", "//", ">>", "<<", "<=", ">=", "==", "!=",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@", "&",
    "|", "^", "~", "<", ">", "=",
];

const PUNCTUATION: &[&str] = &["...", "(", ")", "[", "]", "{", "}", ",", ":", ";", ".", "\\"];

fn classify_identifier(name: &str, after_dot: bool) -> TokenType {
    if after_dot {
        TokenType::Attribute
    } else if KEYWORDS.contains(&name) {
        TokenType::Keyword
    } else if BUILTIN_CONSTANTS.contains(&name) {
        TokenType::BuiltinConstant
    } else if BUILTINS.contains(&name) {
        TokenType::Builtin
    } else if name.len() > 4 && name.starts_with("__") && name.ends_with("__") {
        TokenType::MagicName
    } else {
        TokenType::Variable
    }
}

/// Split Python source into tokens. Never fails; characters that fit no
/// rule become [`TokenType::Unidentified`].
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    Tokenizer {
        source,
        position: 0,
        tokens: &mut tokens,
    }
    .run();
    tokens
}

struct Tokenizer<'a, 't> {
    source: &'a str,
    position: usize,
    tokens: &'t mut Vec<Token>,
}

impl Tokenizer<'_, '_> {
    fn rest(&self) -> &str {
        &self.source[self.position..]
    }

    fn push(&mut self, kind: TokenType, length: usize) {
        let text = &self.source[self.position..self.position + length];
        self.tokens.push(Token::new(kind, text));
        self.position += length;
    }

    fn after_dot(&self) -> bool {
        self.tokens
            .iter()
            .rev()
            .find(|token| token.kind != TokenType::Space)
            .is_some_and(|token| token.kind == TokenType::Punctuation && token.text == ".")
    }

    fn run(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            let rest = self.rest();

            if rest.starts_with("\r\n") {
                self.push(TokenType::Linebreak, 2);
            } else if c == '\n' || c == '\r' {
                self.push(TokenType::Linebreak, 1);
            } else if c == ' ' || c == '\t' {
                let length = rest.len() - rest.trim_start_matches([' ', '\t']).len();
                self.push(TokenType::Space, length);
            } else if c == '#' {
                let length = rest.find(['\n', '\r']).unwrap_or(rest.len());
                self.push(TokenType::Comment, length);
            } else if let Some((prefix, quote)) = string_start(rest) {
                self.string(prefix, quote);
            } else if c.is_ascii_digit()
                || (c == '.' && rest[1..].starts_with(|d: char| d.is_ascii_digit()))
            {
                let length = number_length(rest);
                self.push(TokenType::Number, length);
            } else if c.is_alphabetic() || c == '_' {
                let length = rest
                    .char_indices()
                    .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
                    .map_or(rest.len(), |(index, _)| index);
                let kind = classify_identifier(&rest[..length], self.after_dot());
                self.push(kind, length);
            } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                self.push(TokenType::Operator, op.len());
            } else if let Some(mark) = PUNCTUATION.iter().find(|mark| rest.starts_with(**mark)) {
                self.push(TokenType::Punctuation, mark.len());
            } else {
                self.push(TokenType::Unidentified, c.len_utf8());
            }
        }
    }

    /// Emit a string literal starting at the cursor.
    fn string(&mut self, prefix: usize, quote: &'static str) {
        let is_format = self.rest()[..prefix].contains(['f', 'F']);
        let body_start = prefix + quote.len();
        let body = &self.rest()[body_start..];
        let single_line = quote.len() == 1;

        // Byte offset of the closing quote inside `body`.
        let mut end = None;
        let mut chars = body.char_indices();
        while let Some((index, c)) = chars.next() {
            // Raw strings still cannot end on an escaped quote.
            if c == '\\' {
                chars.next();
                continue;
            }
            if single_line && c == '\n' {
                break;
            }
            if body[index..].starts_with(quote) {
                end = Some(index);
                break;
            }
        }

        if !is_format {
            let length = match end {
                Some(index) => body_start + index + quote.len(),
                None => body_start + body.find('\n').filter(|_| single_line).unwrap_or(body.len()),
            };
            self.push(TokenType::String, length);
            return;
        }

        let content_end = end.unwrap_or_else(|| {
            if single_line {
                body.find('\n').unwrap_or(body.len())
            } else {
                body.len()
            }
        });
        self.push(TokenType::FormatString, body_start);
        self.format_string_body(content_end);
        if end.is_some() {
            self.push(TokenType::FormatString, quote.len());
        }
    }

    /// Literal parts and `{...}` interpolations of an f-string body of
    /// `length` bytes.
    fn format_string_body(&mut self, length: usize) {
        let end = self.position + length;
        let mut literal_start = self.position;
        let mut cursor = self.position;

        while cursor < end {
            let rest = &self.source[cursor..end];
            if rest.starts_with("{{") || rest.starts_with("}}") {
                cursor += 2;
                continue;
            }
            if rest.starts_with('{') {
                if cursor > literal_start {
                    self.tokens.push(Token::new(
                        TokenType::FormatString,
                        &self.source[literal_start..cursor],
                    ));
                }
                self.position = cursor;
                self.push(TokenType::Punctuation, 1);
                cursor = self.interpolation(end);
                literal_start = cursor;
                continue;
            }
            cursor += rest.chars().next().map_or(1, char::len_utf8);
        }

        if end > literal_start {
            self.tokens.push(Token::new(
                TokenType::FormatString,
                &self.source[literal_start..end],
            ));
        }
        self.position = end;
    }

    /// Tokenize the expression of an interpolation starting at the cursor,
    /// its format spec and closing brace. Returns the position after it.
    fn interpolation(&mut self, end: usize) -> usize {
        let start = self.position;
        let source = self.source;
        let bytes = source.as_bytes();
        let mut depth = 0usize;
        let mut cursor = start;
        let mut quote: Option<u8> = None;

        while cursor < end {
            let byte = bytes[cursor];
            match quote {
                Some(open) => {
                    if byte == open {
                        quote = None;
                    }
                }
                None => match byte {
                    b'\'' | b'"' => quote = Some(byte),
                    b'(' | b'[' | b'{' => depth += 1,
                    b')' | b']' => depth = depth.saturating_sub(1),
                    b'}' if depth > 0 => depth -= 1,
                    // `!=` is an operator, `!r` a conversion.
                    b'!' if depth == 0 && bytes.get(cursor + 1) == Some(&b'=') => cursor += 1,
                    b'}' | b':' | b'!' if depth == 0 => break,
                    _ => {}
                },
            }
            cursor += 1;
        }

        for token in tokenize(&self.source[start..cursor]) {
            self.tokens.push(token);
        }
        self.position = cursor;

        if cursor < end && bytes[cursor] != b'}' {
            // Conversion and format spec run up to the closing brace.
            let spec_end = self.source[cursor..end]
                .find('}')
                .map_or(end, |offset| cursor + offset);
            self.push(TokenType::Punctuation, 1);
            if spec_end > self.position {
                self.tokens.push(Token::new(
                    TokenType::FormatString,
                    &self.source[self.position..spec_end],
                ));
            }
            self.position = spec_end;
        }
        if self.position < end {
            self.push(TokenType::Punctuation, 1);
        }
        self.position
    }
}

/// `(prefix length, quote)` when a string literal starts here.
fn string_start(rest: &str) -> Option<(usize, &'static str)> {
    let prefix = rest
        .chars()
        .take(3)
        .take_while(|c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F'))
        .count()
        .min(2);
    for length in (0..=prefix).rev() {
        let after = &rest[length..];
        for quote in ["\"\"\"", "'''", "\"", "'"] {
            if after.starts_with(quote) {
                return Some((length, quote));
            }
        }
    }
    None
}

fn number_length(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let lower = rest.get(..2).map(str::to_ascii_lowercase);
    if matches!(lower.as_deref(), Some("0x" | "0o" | "0b")) {
        return 2 + rest[2..]
            .bytes()
            .take_while(|b| b.is_ascii_hexdigit() || *b == b'_')
            .count();
    }

    let mut index = 0;
    let digits = |index: &mut usize| {
        while *index < bytes.len() && (bytes[*index].is_ascii_digit() || bytes[*index] == b'_') {
            *index += 1;
        }
    };
    digits(&mut index);
    if index < bytes.len() && bytes[index] == b'.' {
        index += 1;
        digits(&mut index);
    }
    if index < bytes.len() && matches!(bytes[index], b'e' | b'E') {
        let mut exponent = index + 1;
        if exponent < bytes.len() && matches!(bytes[exponent], b'+' | b'-') {
            exponent += 1;
        }
        if exponent < bytes.len() && bytes[exponent].is_ascii_digit() {
            index = exponent;
            digits(&mut index);
        }
    }
    if index < bytes.len() && matches!(bytes[index], b'j' | b'J') {
        index += 1;
    }
    index
}
