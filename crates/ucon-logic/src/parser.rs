//! Reader for the clause syntax used by theories and test goals.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! clause   := term [":-" term] "."
//! term     := conj { ";" conj }          right associative
//! conj     := unary { "," unary }        right associative
//! unary    := "\+" unary | compare
//! compare  := pair [ OP pair ]           OP in = \= == \== < > =< >= =:= =\=
//! pair     := primary { "-" primary }
//! primary  := VAR | NUMBER | "-" NUMBER | ATOM ["(" args ")"] | "[" [args] "]" | "(" term ")"
//! args     := unary { "," unary }
//! ```

use crate::error::ParseError;
use crate::library::Clause;
use crate::term::Term;

const COMPARISONS: [&str; 10] = ["=", "\\=", "==", "\\==", "<", ">", "=<", ">=", "=:=", "=\\="];
const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(String),
    Var(String),
    Int(i64),
    Real(f64),
    Symbol(String),
    Open,
    Close,
    OpenList,
    CloseList,
    Comma,
    Semicolon,
    Neck,
    End,
}

// ============================================================================
// Lexer
// ============================================================================

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('%') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if accept(c)) {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(c) = self.peek_char() else {
                return Ok(tokens);
            };
            let token = match c {
                '(' => self.single(Token::Open),
                ')' => self.single(Token::Close),
                '[' => self.single(Token::OpenList),
                ']' => self.single(Token::CloseList),
                ',' => self.single(Token::Comma),
                ';' => self.single(Token::Semicolon),
                '\'' => self.quoted(start)?,
                c if c.is_ascii_digit() => self.number(start)?,
                c if c.is_ascii_lowercase() => {
                    Token::Atom(self.take_while(is_word_char).to_string())
                }
                c if c.is_ascii_uppercase() || c == '_' => {
                    Token::Var(self.take_while(is_word_char).to_string())
                }
                c if SYMBOL_CHARS.contains(c) => {
                    let run = self.take_while(|c| SYMBOL_CHARS.contains(c));
                    match run {
                        ":-" => Token::Neck,
                        "." => Token::End,
                        other => Token::Symbol(other.to_string()),
                    }
                }
                other => {
                    return Err(ParseError::new(format!("unexpected character '{other}'"), start));
                }
            };
            tokens.push((token, start));
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn quoted(&mut self, start: usize) -> Result<Token, ParseError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\'') => return Ok(Token::Atom(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some(escaped) => value.push(escaped),
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(ParseError::new("unterminated quoted atom", start))
    }

    fn number(&mut self, start: usize) -> Result<Token, ParseError> {
        self.take_while(|c| c.is_ascii_digit());
        let rest = &self.text[self.pos..];
        let is_real = rest.starts_with('.')
            && rest[1..].chars().next().is_some_and(|c| c.is_ascii_digit());
        if is_real {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
            if matches!(self.peek_char(), Some('e' | 'E')) {
                self.bump();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.bump();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
            let literal = &self.text[start..self.pos];
            literal
                .parse()
                .map(Token::Real)
                .map_err(|_| ParseError::new(format!("invalid real '{literal}'"), start))
        } else {
            let literal = &self.text[start..self.pos];
            literal
                .parse()
                .map(Token::Int)
                .map_err(|_| ParseError::new(format!("integer '{literal}' out of range"), start))
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
    len: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: Lexer::new(text).tokenize()?,
            index: 0,
            len: text.len(),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.index)
            .map_or(self.len, |(_, offset)| *offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|(token, _)| token.clone());
        self.index += 1;
        token
    }

    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.index += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn error(&self, message: String) -> ParseError {
        ParseError::new(message, self.offset())
    }

    fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if s == symbol)
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        let left = self.conjunction()?;
        if self.peek() == Some(&Token::Semicolon) {
            self.index += 1;
            let right = self.term()?;
            return Ok(Term::or(left, right));
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> Result<Term, ParseError> {
        let left = self.unary()?;
        if self.peek() == Some(&Token::Comma) {
            self.index += 1;
            let right = self.conjunction()?;
            return Ok(Term::and(left, right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Term, ParseError> {
        if self.is_symbol("\\+") {
            self.index += 1;
            let goal = self.unary()?;
            return Ok(Term::compound("\\+", [goal]));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Term, ParseError> {
        let left = self.pair()?;
        if let Some(Token::Symbol(op)) = self.peek() {
            if COMPARISONS.contains(&op.as_str()) {
                let op = op.clone();
                self.index += 1;
                let right = self.pair()?;
                return Ok(Term::compound(op, [left, right]));
            }
            return Err(self.error(format!("unknown operator '{op}'")));
        }
        Ok(left)
    }

    fn pair(&mut self) -> Result<Term, ParseError> {
        let mut left = self.primary()?;
        while self.is_symbol("-") {
            self.index += 1;
            let right = self.primary()?;
            left = Term::pair(left, right);
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Term, ParseError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Var(name)) => Ok(Term::var(name)),
            Some(Token::Int(value)) => Ok(Term::int(value)),
            Some(Token::Real(value)) => Ok(Term::real(value)),
            Some(Token::Symbol(symbol)) if symbol == "-" => match self.advance() {
                Some(Token::Int(value)) => Ok(Term::int(-value)),
                Some(Token::Real(value)) => Ok(Term::real(-value)),
                _ => Err(ParseError::new("expected a number after '-'", offset)),
            },
            Some(Token::Atom(name)) => {
                if self.peek() == Some(&Token::Open) {
                    self.index += 1;
                    let args = self.arguments(&Token::Close, "')'")?;
                    Ok(Term::compound(name, args))
                } else {
                    Ok(Term::atom(name))
                }
            }
            Some(Token::OpenList) => {
                if self.peek() == Some(&Token::CloseList) {
                    self.index += 1;
                    return Ok(Term::empty_list());
                }
                let items = self.arguments(&Token::CloseList, "']'")?;
                Ok(Term::list(items))
            }
            Some(Token::Open) => {
                let inner = self.term()?;
                self.expect(&Token::Close, "')'")?;
                Ok(inner)
            }
            Some(other) => Err(ParseError::new(format!("unexpected token {other:?}"), offset)),
            None => Err(ParseError::new("unexpected end of input", offset)),
        }
    }

    fn arguments(&mut self, close: &Token, what: &str) -> Result<Vec<Term>, ParseError> {
        let mut args = vec![self.unary()?];
        while self.peek() == Some(&Token::Comma) {
            self.index += 1;
            args.push(self.unary()?);
        }
        self.expect(close, what)?;
        Ok(args)
    }

    fn clause(&mut self) -> Result<Clause, ParseError> {
        let head = self.term()?;
        if head.signature().is_none() {
            return Err(self.error(format!("clause head {head} is not callable")));
        }
        let clause = if self.peek() == Some(&Token::Neck) {
            self.index += 1;
            Clause::rule(head, self.term()?)
        } else {
            Clause::fact(head)
        };
        self.expect(&Token::End, "'.' at end of clause")?;
        Ok(clause)
    }
}

/// Parses a single term. A trailing `.` is allowed.
pub(crate) fn parse_term(text: &str) -> Result<Term, ParseError> {
    let mut parser = Parser::new(text)?;
    let term = parser.term()?;
    if parser.peek() == Some(&Token::End) {
        parser.index += 1;
    }
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input".to_string()));
    }
    Ok(term)
}

/// Parses a sequence of `.`-terminated clauses.
pub(crate) fn parse_clauses(text: &str) -> Result<Vec<Clause>, ParseError> {
    let mut parser = Parser::new(text)?;
    let mut clauses = Vec::new();
    while !parser.at_end() {
        clauses.push(parser.clause()?);
    }
    Ok(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn parses_compound_goal() {
        let goal = parse_term("father(abraham, X)").unwrap();
        assert_eq!(
            goal,
            Term::compound("father", [Term::atom("abraham"), Term::var("X")])
        );
    }

    #[test]
    fn conjunction_binds_tighter_than_disjunction() {
        let goal = parse_term("a, b ; c").unwrap();
        assert_eq!(
            goal,
            Term::or(Term::and(Term::atom("a"), Term::atom("b")), Term::atom("c"))
        );
    }

    #[test]
    fn negation_binds_tighter_than_conjunction() {
        let goal = parse_term("\\+ a, b").unwrap();
        assert_eq!(
            goal,
            Term::and(Term::compound("\\+", [Term::atom("a")]), Term::atom("b"))
        );
    }

    #[test]
    fn parses_lists_pairs_and_negative_numbers() {
        let goal = parse_term("rpa(r, w, [role1-[read], role2-[]]), X > -3, Y = -0.5").unwrap();
        assert_eq!(
            goal.to_string(),
            "(rpa(r, w, [role1-[read], role2-[]]), (X > -3, Y = -0.5))"
        );
    }

    #[test_case(Term::pair(Term::atom("a"), Term::int(-3)), "a-(-3)"; "negative int in pair")]
    #[test_case(Term::pair(Term::int(-3), Term::real(-0.5)), "-3-(-0.5)"; "negative real in pair")]
    #[test_case(Term::real(1e15), "1000000000000000.0"; "large real")]
    #[test_case(Term::real(-1e20), "-1.0e20"; "real in exponent form")]
    #[test_case(Term::real(2.5e-8), "2.5e-8"; "small real")]
    fn displayed_numbers_parse_back(term: Term, text: &str) {
        assert_eq!(term.to_string(), text);
        assert_eq!(parse_term(text).unwrap(), term);
    }

    #[test]
    fn parses_quoted_atoms_with_escapes() {
        let goal = parse_term("notify_monitor('it\\'s done', 'Monitor:1')").unwrap();
        assert_eq!(
            goal,
            Term::compound(
                "notify_monitor",
                [Term::atom("it's done"), Term::atom("Monitor:1")]
            )
        );
    }

    #[test]
    fn parses_clauses_with_comments() {
        let clauses = parse_clauses(
            "% family facts\n\
             father(abraham, isaac).\n\
             grandfather(X, Z) :- father(X, Y), father(Y, Z).",
        )
        .unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1].head().to_string(), "grandfather(X, Z)");
        assert_eq!(clauses[1].body().to_string(), "(father(X, Y), father(Y, Z))");
    }

    #[test_case("father(abraham"; "unclosed argument list")]
    #[test_case("a ++ b"; "unknown operator")]
    #[test_case("'open"; "unterminated quote")]
    #[test_case("a $ b"; "unexpected character")]
    #[test_case("a b"; "trailing input")]
    fn rejects_malformed_goals(text: &str) {
        assert!(parse_term(text).is_err());
    }

    #[test]
    fn clause_requires_terminating_period() {
        assert!(parse_clauses("father(abraham, isaac)").is_err());
        assert!(parse_clauses("42.").is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_number() -> impl Strategy<Value = Term> {
            prop_oneof![
                (-1000i64..1000).prop_map(Term::int),
                (prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO)
                    .prop_map(Term::real),
            ]
        }

        fn arb_leaf() -> impl Strategy<Value = Term> {
            prop_oneof![
                "[a-z][a-z0-9_]{0,6}".prop_map(Term::atom),
                "[A-Z][a-z0-9]{0,3}".prop_map(Term::var),
                arb_number(),
                (arb_number(), arb_number()).prop_map(|(left, right)| Term::pair(left, right)),
                "[a-zA-Z]{1,4}:[a-z$]{1,6}".prop_map(Term::atom),
            ]
        }

        fn arb_goal() -> impl Strategy<Value = Term> {
            let call = ("[a-z][a-z_]{0,6}", prop::collection::vec(arb_leaf(), 1..4))
                .prop_map(|(functor, args)| Term::compound(functor, args));
            call.prop_recursive(3, 16, 2, |inner| {
                prop_oneof![
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| Term::and(a, b)),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| Term::or(a, b)),
                    inner.prop_map(Term::not),
                ]
            })
        }

        proptest! {
            #[test]
            fn displayed_goals_parse_back(goal in arb_goal()) {
                prop_assert_eq!(parse_term(&goal.to_string()).unwrap(), goal);
            }
        }
    }
}
