//! Python expression recognizer used to classify single-grave content.
//!
//! Mirrors what `ast.literal_eval` decides: a literal, a valid expression that
//! is not a literal, or text that does not parse as an expression at all.

/// Outcome of classifying a grave's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralClass {
    /// Accepted by `literal_eval`.
    Literal,
    /// A valid expression `literal_eval` rejects (names, calls, attributes).
    NotLiteral,
    /// Not a Python expression.
    Invalid,
}

/// Classify `source` the way `ast.literal_eval` would treat it.
pub fn classify_literal(source: &str) -> LiteralClass {
    let source = source.trim_start_matches([' ', '\t']);
    let Some(tokens) = lex(source) else {
        return LiteralClass::Invalid;
    };
    let mut parser = Parser { tokens, position: 0 };
    match parser.parse_top() {
        Some(expr) if parser.at_end() => {
            if expr.is_literal() {
                LiteralClass::Literal
            } else {
                LiteralClass::NotLiteral
            }
        }
        _ => LiteralClass::Invalid,
    }
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", "<<", ">>", "<=", ">=", "==",
    "!=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@",
    "&", "|", "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "=",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Keyword(&'static str),
    Number { complex: bool },
    Str { formatted: bool, bytes: bool },
    Op(&'static str),
}

fn lex(source: &str) -> Option<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;
    let mut depth = 0usize;

    while index < chars.len() {
        let c = chars[index];

        if c == ' ' || c == '\t' || c == '\x0c' {
            index += 1;
            continue;
        }
        if c == '\n' || c == '\r' {
            // Only implicit line joining inside brackets.
            if depth == 0 {
                if chars[index..].iter().all(|c| c.is_whitespace()) {
                    break;
                }
                return None;
            }
            index += 1;
            continue;
        }
        if c == '\\' && matches!(chars.get(index + 1), Some('\n')) {
            index += 2;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = index;
            while index < chars.len() && (chars[index].is_alphanumeric() || chars[index] == '_') {
                index += 1;
            }
            let word: String = chars[start..index].iter().collect();

            if matches!(chars.get(index), Some('\'' | '"')) && is_string_prefix(&word) {
                let lower = word.to_ascii_lowercase();
                index = lex_string_body(&chars, index)?;
                tokens.push(Token::Str {
                    formatted: lower.contains('f'),
                    bytes: lower.contains('b'),
                });
                continue;
            }

            match KEYWORDS.iter().find(|k| **k == word) {
                Some(keyword) => tokens.push(Token::Keyword(*keyword)),
                None => tokens.push(Token::Name(word)),
            }
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(index + 1).is_some_and(char::is_ascii_digit)) {
            let (end, complex) = lex_number(&chars, index)?;
            index = end;
            tokens.push(Token::Number { complex });
            continue;
        }

        if c == '\'' || c == '"' {
            index = lex_string_body(&chars, index)?;
            tokens.push(Token::Str {
                formatted: false,
                bytes: false,
            });
            continue;
        }

        let rest: String = chars[index..chars.len().min(index + 3)].iter().collect();
        let op = OPERATORS.iter().find(|op| rest.starts_with(**op))?;
        match *op {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.checked_sub(1)?,
            _ => {}
        }
        index += op.chars().count();
        tokens.push(Token::Op(*op));
    }

    (depth == 0).then_some(tokens)
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

/// Consume a quoted string starting at the opening quote.
fn lex_string_body(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut index = if triple { start + 3 } else { start + 1 };

    while index < chars.len() {
        let c = chars[index];
        if c == '\\' {
            index += 2;
            continue;
        }
        if triple {
            if c == quote && chars.get(index + 1) == Some(&quote) && chars.get(index + 2) == Some(&quote) {
                return Some(index + 3);
            }
        } else {
            if c == '\n' {
                return None;
            }
            if c == quote {
                return Some(index + 1);
            }
        }
        index += 1;
    }
    None
}

fn lex_number(chars: &[char], start: usize) -> Option<(usize, bool)> {
    let mut index = start;
    let radix_digit = |c: char, radix: char| match radix {
        'x' => c.is_ascii_hexdigit(),
        'o' => ('0'..='7').contains(&c),
        _ => c == '0' || c == '1',
    };

    if chars[index] == '0' {
        if let Some(radix) = chars.get(index + 1).map(|c| c.to_ascii_lowercase()) {
            if matches!(radix, 'x' | 'o' | 'b') {
                index += 2;
                let digits_start = index;
                while index < chars.len() && (radix_digit(chars[index], radix) || chars[index] == '_') {
                    index += 1;
                }
                if index == digits_start || chars[index - 1] == '_' {
                    return None;
                }
                return finish_number(chars, index, false);
            }
        }
    }

    let digits = |index: &mut usize| {
        let begin = *index;
        while *index < chars.len() && (chars[*index].is_ascii_digit() || chars[*index] == '_') {
            *index += 1;
        }
        *index > begin
    };

    digits(&mut index);
    if chars.get(index) == Some(&'.') {
        index += 1;
        digits(&mut index);
    }
    if matches!(chars.get(index), Some('e' | 'E')) {
        index += 1;
        if matches!(chars.get(index), Some('+' | '-')) {
            index += 1;
        }
        if !digits(&mut index) {
            return None;
        }
    }
    if chars[index - 1] == '_' {
        return None;
    }
    let complex = matches!(chars.get(index), Some('j' | 'J'));
    if complex {
        index += 1;
    }
    finish_number(chars, index, complex)
}

fn finish_number(chars: &[char], index: usize, complex: bool) -> Option<(usize, bool)> {
    // `1abc` is a syntax error, not a number followed by a name.
    match chars.get(index) {
        Some(c) if c.is_alphanumeric() || *c == '_' => None,
        _ => Some((index, complex)),
    }
}

#[derive(Debug)]
enum Expr {
    Number { complex: bool },
    Str { formatted: bool },
    Constant,
    Name,
    Unary { numeric_operand: bool, signed_real: bool },
    ComplexSum,
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    EmptySetCall,
    Other,
}

impl Expr {
    fn is_literal(&self) -> bool {
        match self {
            Expr::Number { .. } | Expr::Constant | Expr::ComplexSum => true,
            Expr::Str { formatted } => !formatted,
            Expr::Unary { numeric_operand, .. } => *numeric_operand,
            Expr::Tuple(items) | Expr::List(items) | Expr::Set(items) => {
                items.iter().all(Expr::is_literal)
            }
            Expr::Dict(pairs) => pairs.iter().all(|(k, v)| k.is_literal() && v.is_literal()),
            Expr::EmptySetCall => true,
            Expr::Name | Expr::Other => false,
        }
    }

    fn is_signed_real(&self) -> bool {
        matches!(self, Expr::Number { complex: false })
            || matches!(self, Expr::Unary { signed_real: true, .. })
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Keyword(k)) if *k == keyword)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek_op(op) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Option<()> {
        self.eat_op(op).then_some(())
    }

    fn expect_name(&mut self) -> Option<()> {
        match self.peek() {
            Some(Token::Name(_)) => {
                self.position += 1;
                Some(())
            }
            _ => None,
        }
    }

    /// `expression (',' expression)* [',']` at top level.
    fn parse_top(&mut self) -> Option<Expr> {
        if self.at_end() {
            return None;
        }
        let first = self.parse_star_or_expr()?;
        if !self.peek_op(",") {
            return Some(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_end() {
                break;
            }
            items.push(self.parse_star_or_expr()?);
        }
        Some(Expr::Tuple(items))
    }

    fn parse_star_or_expr(&mut self) -> Option<Expr> {
        if self.eat_op("*") {
            self.parse_bitor()?;
            return Some(Expr::Other);
        }
        self.parse_expr()
    }

    fn parse_expr(&mut self) -> Option<Expr> {
        if self.eat_keyword("lambda") {
            self.parse_lambda_params()?;
            self.expect_op(":")?;
            self.parse_expr()?;
            return Some(Expr::Other);
        }
        let test = self.parse_or()?;
        if self.eat_keyword("if") {
            self.parse_or()?;
            if !self.eat_keyword("else") {
                return None;
            }
            self.parse_expr()?;
            return Some(Expr::Other);
        }
        Some(test)
    }

    fn parse_lambda_params(&mut self) -> Option<()> {
        while !self.peek_op(":") {
            if self.eat_op("*") || self.eat_op("**") {
                // A bare `*` separates keyword-only parameters.
                if !self.peek_op(",") && !self.peek_op(":") {
                    self.expect_name()?;
                }
            } else if !self.eat_op("/") {
                self.expect_name()?;
                if self.eat_op("=") {
                    self.parse_expr()?;
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        Some(())
    }

    /// Expression allowing the walrus operator, used inside brackets.
    fn parse_named(&mut self) -> Option<Expr> {
        let is_walrus = matches!(self.peek(), Some(Token::Name(_)))
            && matches!(self.tokens.get(self.position + 1), Some(Token::Op(":=")));
        if is_walrus {
            self.position += 2;
            self.parse_expr()?;
            return Some(Expr::Other);
        }
        self.parse_expr()
    }

    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            self.parse_and()?;
            left = Expr::Other;
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            self.parse_not()?;
            left = Expr::Other;
        }
        Some(left)
    }

    fn parse_not(&mut self) -> Option<Expr> {
        if self.eat_keyword("not") {
            self.parse_not()?;
            return Some(Expr::Other);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Option<Expr> {
        let mut left = self.parse_bitor()?;
        loop {
            let matched = ["<", ">", "==", ">=", "<=", "!="]
                .iter()
                .any(|op| self.eat_op(op))
                || self.eat_keyword("in")
                || (self.peek_keyword("not")
                    && matches!(self.tokens.get(self.position + 1), Some(Token::Keyword("in")))
                    && {
                        self.position += 2;
                        true
                    })
                || (self.eat_keyword("is") && {
                    self.eat_keyword("not");
                    true
                });
            if !matched {
                return Some(left);
            }
            self.parse_bitor()?;
            left = Expr::Other;
        }
    }

    fn parse_binary(
        &mut self,
        ops: &[&str],
        next: fn(&mut Self) -> Option<Expr>,
    ) -> Option<Expr> {
        let mut left = next(self)?;
        while ops.iter().any(|op| self.eat_op(op)) {
            next(self)?;
            left = Expr::Other;
        }
        Some(left)
    }

    fn parse_bitor(&mut self) -> Option<Expr> {
        self.parse_binary(&["|"], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> Option<Expr> {
        self.parse_binary(&["^"], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Option<Expr> {
        self.parse_binary(&["&"], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        self.parse_binary(&["<<", ">>"], Self::parse_arith)
    }

    fn parse_arith(&mut self) -> Option<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let plus = self.eat_op("+");
            if !plus && !self.eat_op("-") {
                return Some(left);
            }
            let right = self.parse_term()?;
            // `1+2j` and `-1-2j` are accepted by literal_eval.
            left = if left.is_signed_real() && matches!(right, Expr::Number { complex: true }) {
                Expr::ComplexSum
            } else {
                Expr::Other
            };
        }
    }

    fn parse_term(&mut self) -> Option<Expr> {
        self.parse_binary(&["*", "/", "//", "%", "@"], Self::parse_factor)
    }

    fn parse_factor(&mut self) -> Option<Expr> {
        let signed = if self.eat_op("+") || self.eat_op("-") {
            true
        } else if self.eat_op("~") {
            self.parse_factor()?;
            return Some(Expr::Other);
        } else {
            false
        };
        if !signed {
            return self.parse_power();
        }
        let operand = self.parse_factor()?;
        Some(match operand {
            Expr::Number { complex } => Expr::Unary {
                numeric_operand: true,
                signed_real: !complex,
            },
            _ => Expr::Unary {
                numeric_operand: false,
                signed_real: false,
            },
        })
    }

    fn parse_power(&mut self) -> Option<Expr> {
        if self.eat_keyword("await") {
            self.parse_primary()?;
            if self.eat_op("**") {
                self.parse_factor()?;
            }
            return Some(Expr::Other);
        }
        let base = self.parse_primary()?;
        if self.eat_op("**") {
            self.parse_factor()?;
            return Some(Expr::Other);
        }
        Some(base)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let is_set_name = matches!(self.peek(), Some(Token::Name(name)) if name == "set");
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_op(".") {
                self.expect_name()?;
                expr = Expr::Other;
            } else if self.eat_op("(") {
                let argument_count = self.parse_call_arguments()?;
                expr = if is_set_name && argument_count == 0 && matches!(expr, Expr::Name) {
                    Expr::EmptySetCall
                } else {
                    Expr::Other
                };
            } else if self.eat_op("[") {
                self.parse_subscripts()?;
                expr = Expr::Other;
            } else {
                return Some(expr);
            }
        }
    }

    fn parse_call_arguments(&mut self) -> Option<usize> {
        let mut count = 0;
        while !self.eat_op(")") {
            if self.eat_op("**") || self.eat_op("*") {
                self.parse_expr()?;
            } else if matches!(self.peek(), Some(Token::Name(_)))
                && matches!(self.tokens.get(self.position + 1), Some(Token::Op("=")))
            {
                self.position += 2;
                self.parse_expr()?;
            } else {
                self.parse_named()?;
                if self.peek_keyword("for") || self.peek_keyword("async") {
                    self.parse_comprehension_clauses()?;
                }
            }
            count += 1;
            if !self.eat_op(",") {
                self.expect_op(")")?;
                break;
            }
        }
        Some(count)
    }

    fn parse_subscripts(&mut self) -> Option<()> {
        loop {
            self.parse_slice()?;
            if !self.eat_op(",") || self.peek_op("]") {
                break;
            }
        }
        self.expect_op("]")
    }

    fn parse_slice(&mut self) -> Option<()> {
        if !self.peek_op(":") {
            if self.eat_op("*") {
                self.parse_bitor()?;
                return Some(());
            }
            self.parse_named()?;
        }
        for _ in 0..2 {
            if !self.eat_op(":") {
                break;
            }
            if !self.peek_op(":") && !self.peek_op("]") && !self.peek_op(",") {
                self.parse_expr()?;
            }
        }
        Some(())
    }

    fn parse_comprehension_clauses(&mut self) -> Option<()> {
        let mut seen = false;
        loop {
            let is_async = self.peek_keyword("async");
            if is_async {
                self.position += 1;
            }
            if !self.eat_keyword("for") {
                return (seen && !is_async).then_some(());
            }
            seen = true;
            self.parse_targets()?;
            if !self.eat_keyword("in") {
                return None;
            }
            self.parse_or()?;
            while self.eat_keyword("if") {
                self.parse_or()?;
            }
        }
    }

    fn parse_targets(&mut self) -> Option<()> {
        loop {
            self.eat_op("*");
            self.parse_bitor()?;
            if !self.eat_op(",") || self.peek_keyword("in") {
                return Some(());
            }
        }
    }

    fn parse_atom(&mut self) -> Option<Expr> {
        let token = self.peek()?.clone();
        self.position += 1;
        match token {
            Token::Name(_) => Some(Expr::Name),
            Token::Keyword("True" | "False" | "None") => Some(Expr::Constant),
            Token::Keyword(_) => None,
            Token::Number { complex } => Some(Expr::Number { complex }),
            Token::Str { formatted, bytes } => {
                let mut formatted = formatted;
                // Adjacent string literals concatenate; str and bytes cannot mix.
                while let Some(Token::Str {
                    formatted: next_formatted,
                    bytes: next_bytes,
                }) = self.peek().cloned()
                {
                    if next_bytes != bytes {
                        return None;
                    }
                    formatted |= next_formatted;
                    self.position += 1;
                }
                Some(Expr::Str { formatted })
            }
            Token::Op("...") => Some(Expr::Constant),
            Token::Op("(") => self.parse_parenthesized(),
            Token::Op("[") => self.parse_list(),
            Token::Op("{") => self.parse_brace(),
            Token::Op(_) => None,
        }
    }

    fn parse_parenthesized(&mut self) -> Option<Expr> {
        if self.eat_op(")") {
            return Some(Expr::Tuple(Vec::new()));
        }
        if self.eat_keyword("yield") {
            if self.eat_keyword("from") {
                self.parse_expr()?;
            } else if !self.peek_op(")") {
                self.parse_top_in_brackets()?;
            }
            self.expect_op(")")?;
            return Some(Expr::Other);
        }
        let first = self.parse_star_or_named()?;
        if self.peek_keyword("for") || self.peek_keyword("async") {
            self.parse_comprehension_clauses()?;
            self.expect_op(")")?;
            return Some(Expr::Other);
        }
        if self.eat_op(")") {
            return Some(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.peek_op(")") {
                break;
            }
            items.push(self.parse_star_or_named()?);
        }
        self.expect_op(")")?;
        Some(Expr::Tuple(items))
    }

    fn parse_top_in_brackets(&mut self) -> Option<()> {
        loop {
            self.parse_star_or_named()?;
            if !self.eat_op(",") || self.peek_op(")") {
                return Some(());
            }
        }
    }

    fn parse_star_or_named(&mut self) -> Option<Expr> {
        if self.eat_op("*") {
            self.parse_bitor()?;
            return Some(Expr::Other);
        }
        self.parse_named()
    }

    fn parse_list(&mut self) -> Option<Expr> {
        let mut items = Vec::new();
        if self.eat_op("]") {
            return Some(Expr::List(items));
        }
        items.push(self.parse_star_or_named()?);
        if self.peek_keyword("for") || self.peek_keyword("async") {
            self.parse_comprehension_clauses()?;
            self.expect_op("]")?;
            return Some(Expr::Other);
        }
        while self.eat_op(",") {
            if self.peek_op("]") {
                break;
            }
            items.push(self.parse_star_or_named()?);
        }
        self.expect_op("]")?;
        Some(Expr::List(items))
    }

    fn parse_brace(&mut self) -> Option<Expr> {
        if self.eat_op("}") {
            return Some(Expr::Dict(Vec::new()));
        }
        if self.eat_op("**") {
            self.parse_bitor()?;
            self.parse_dict_rest(Vec::new(), false)?;
            return Some(Expr::Other);
        }
        let first = self.parse_star_or_named()?;
        if self.eat_op(":") {
            let value = self.parse_expr()?;
            if self.peek_keyword("for") || self.peek_keyword("async") {
                self.parse_comprehension_clauses()?;
                self.expect_op("}")?;
                return Some(Expr::Other);
            }
            return self.parse_dict_rest(vec![(first, value)], true);
        }
        if self.peek_keyword("for") || self.peek_keyword("async") {
            self.parse_comprehension_clauses()?;
            self.expect_op("}")?;
            return Some(Expr::Other);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.peek_op("}") {
                break;
            }
            items.push(self.parse_star_or_named()?);
        }
        self.expect_op("}")?;
        Some(Expr::Set(items))
    }

    fn parse_dict_rest(&mut self, mut pairs: Vec<(Expr, Expr)>, mut literal: bool) -> Option<Expr> {
        while self.eat_op(",") {
            if self.peek_op("}") {
                break;
            }
            if self.eat_op("**") {
                self.parse_bitor()?;
                literal = false;
                continue;
            }
            let key = self.parse_expr()?;
            self.expect_op(":")?;
            let value = self.parse_expr()?;
            pairs.push((key, value));
        }
        self.expect_op("}")?;
        Some(if literal { Expr::Dict(pairs) } else { Expr::Other })
    }
}
