//! Query lexer (tokenizer).
//!
//! Converts a search-box string into a stream of tokens for the parser.
//!
//! Tokenization is total: malformed input never fails here. Unterminated
//! quotes fold into plain-term text (the parser rejects them only in the
//! contexts that require a balanced value), and a colon-bearing word that
//! does not match one of the operator shapes (`field:`, `exact:`,
//! `range:`) lexes as a plain term, so URLs and timestamps pass through
//! untouched.

use std::{iter::Peekable, str::Chars};

use crate::ast::RangeOp;

/// A token in the search-box language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word (colons included when it is not an operator prefix).
    Term(String),

    /// A quoted phrase; quotes stripped, backslash escapes resolved.
    Phrase(String),

    /// The AND keyword, exact case only.
    And,

    /// The OR keyword, exact case only.
    Or,

    /// The NOT keyword, exact case only.
    Not,

    /// Left parenthesis.
    LParen,

    /// Right parenthesis.
    RParen,

    /// `field:NAME:` prefix, with the value inlined when it was part of
    /// the same word (`field:title:firefox`).
    FieldPrefix {
        /// Field name as typed.
        field: String,
        /// Inline bare-word value, if any.
        value: Option<String>,
    },

    /// `exact:NAME:` prefix, with an optional inline value.
    ExactPrefix {
        /// Field name as typed.
        field: String,
        /// Inline bare-word value, if any.
        value: Option<String>,
    },

    /// `range:NAME:OP:` prefix, with an optional inline value.
    RangePrefix {
        /// Field name as typed.
        field: String,
        /// Comparison operator.
        op: RangeOp,
        /// Inline bare-word value, if any.
        value: Option<String>,
    },
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// Character iterator with one-character lookahead.
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Tokenizes the entire input.
    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token() {
            tokens.push(token);
        }

        tokens
    }

    /// Returns the next token, or None at end of input.
    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();

        let &ch = self.chars.peek()?;

        match ch {
            '(' => {
                self.chars.next();
                Some(Token::LParen)
            }
            ')' => {
                self.chars.next();
                Some(Token::RParen)
            }
            '"' => Some(self.read_quote()),
            _ => Some(self.read_word()),
        }
    }

    /// Reads a quoted phrase, or folds an unterminated quote into a term.
    fn read_quote(&mut self) -> Token {
        if self.has_closing_quote() {
            self.read_phrase()
        } else {
            // No closing quote anywhere ahead: keep the quote character
            // glued to the word it opened and continue as plain text.
            self.read_word()
        }
    }

    /// Checks whether an unescaped closing quote lies ahead.
    ///
    /// Called with the cursor on the opening quote.
    fn has_closing_quote(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next(); // skip opening quote

        let mut escaped = false;
        for ch in ahead {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return true;
            }
        }
        false
    }

    /// Reads a balanced quoted phrase, resolving backslash escapes.
    fn read_phrase(&mut self) -> Token {
        self.chars.next(); // consume opening quote

        let mut content = String::new();

        while let Some(ch) = self.chars.next() {
            match ch {
                '"' => break,
                '\\' => match self.chars.next() {
                    Some(escaped @ ('"' | '\\')) => content.push(escaped),
                    Some(other) => {
                        content.push('\\');
                        content.push(other);
                    }
                    None => content.push('\\'),
                },
                other => content.push(other),
            }
        }

        Token::Phrase(content)
    }

    /// Reads a bare word and classifies it.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        // A leading unterminated quote is part of the word.
        if self.chars.peek() == Some(&'"') {
            word.push('"');
            self.chars.next();
        }

        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            word.push(ch);
            self.chars.next();
        }

        self.classify_word(word)
    }

    /// Classifies a completed word: keyword, operator prefix, or term.
    fn classify_word(&mut self, word: String) -> Token {
        match word.as_str() {
            // Keywords are case-sensitive: lowercase and/or/not stay
            // plain terms.
            "AND" => return Token::And,
            "OR" => return Token::Or,
            "NOT" => return Token::Not,
            _ => {}
        }

        if let Some(token) = self.classify_operator(&word) {
            return token;
        }

        Token::Term(word)
    }

    /// Attempts to read the word as one of the operator prefixes.
    ///
    /// Returns None when the shape does not fully match, in which case
    /// the word is a plain term.
    fn classify_operator(&mut self, word: &str) -> Option<Token> {
        if let Some(rest) = word.strip_prefix("field:") {
            let (field, value) = rest.split_once(':')?;
            if field.is_empty() {
                return None;
            }
            let value = self.inline_value(value, true)?;
            return Some(Token::FieldPrefix {
                field: field.to_string(),
                value,
            });
        }

        if let Some(rest) = word.strip_prefix("exact:") {
            let (field, value) = rest.split_once(':')?;
            if field.is_empty() {
                return None;
            }
            let value = self.inline_value(value, false)?;
            return Some(Token::ExactPrefix {
                field: field.to_string(),
                value,
            });
        }

        if let Some(rest) = word.strip_prefix("range:") {
            let mut parts = rest.splitn(3, ':');
            let field = parts.next()?;
            let op = RangeOp::parse(parts.next()?)?;
            let value = self.inline_value(parts.next()?, false)?;
            if field.is_empty() {
                return None;
            }
            return Some(Token::RangePrefix {
                field: field.to_string(),
                op,
                value,
            });
        }

        None
    }

    /// Resolves an operator's inline value part.
    ///
    /// A non-empty part is the value itself. An empty part is valid only
    /// when the value follows as a quoted phrase (or, for field scopes,
    /// a parenthesized group). Otherwise the whole word was not an
    /// operator after all.
    fn inline_value(&mut self, part: &str, allow_group: bool) -> Option<Option<String>> {
        if !part.is_empty() {
            return Some(Some(part.to_string()));
        }
        match self.chars.peek() {
            Some('"') => Some(None),
            Some('(') if allow_group => Some(None),
            _ => None,
        }
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }
}

/// Tokenizes a query string. Never fails.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> Token {
        Token::Term(s.into())
    }

    #[test]
    fn empty_input() {
        assert_eq!(tokenize(""), vec![]);
        assert_eq!(tokenize("   "), vec![]);
    }

    #[test]
    fn single_term() {
        assert_eq!(tokenize("firefox"), vec![term("firefox")]);
    }

    #[test]
    fn multiple_terms() {
        assert_eq!(
            tokenize("firefox crash"),
            vec![term("firefox"), term("crash")]
        );
    }

    #[test]
    fn quoted_phrase() {
        assert_eq!(
            tokenize("\"address bar\""),
            vec![Token::Phrase("address bar".into())]
        );
    }

    #[test]
    fn phrase_with_escapes() {
        assert_eq!(
            tokenize(r#""say \"hi\" now""#),
            vec![Token::Phrase(r#"say "hi" now"#.into())]
        );
        assert_eq!(
            tokenize(r#""back\\slash""#),
            vec![Token::Phrase(r"back\slash".into())]
        );
    }

    #[test]
    fn unterminated_quote_folds_into_term() {
        assert_eq!(
            tokenize("foo \"bar baz"),
            vec![term("foo"), term("\"bar"), term("baz")]
        );
    }

    #[test]
    fn unterminated_quote_stops_at_paren() {
        assert_eq!(
            tokenize("\"foo(bar"),
            vec![term("\"foo"), Token::LParen, term("bar")]
        );
    }

    #[test]
    fn keywords_exact_case_only() {
        assert_eq!(
            tokenize("a AND b"),
            vec![term("a"), Token::And, term("b")]
        );
        assert_eq!(tokenize("a OR b"), vec![term("a"), Token::Or, term("b")]);
        assert_eq!(tokenize("NOT a"), vec![Token::Not, term("a")]);
        // Lowercase keeps being plain terms.
        assert_eq!(tokenize("a or b"), vec![term("a"), term("or"), term("b")]);
        assert_eq!(
            tokenize("a and b"),
            vec![term("a"), term("and"), term("b")]
        );
        assert_eq!(tokenize("not a"), vec![term("not"), term("a")]);
        // Mixed case is not a keyword either.
        assert_eq!(tokenize("a Or b"), vec![term("a"), term("Or"), term("b")]);
    }

    #[test]
    fn parentheses() {
        assert_eq!(
            tokenize("(firefox crash)"),
            vec![Token::LParen, term("firefox"), term("crash"), Token::RParen]
        );
    }

    #[test]
    fn field_prefix_inline_value() {
        assert_eq!(
            tokenize("field:title:firefox"),
            vec![Token::FieldPrefix {
                field: "title".into(),
                value: Some("firefox".into()),
            }]
        );
    }

    #[test]
    fn field_prefix_quoted_value() {
        assert_eq!(
            tokenize("field:title:\"address bar\""),
            vec![
                Token::FieldPrefix {
                    field: "title".into(),
                    value: None,
                },
                Token::Phrase("address bar".into()),
            ]
        );
    }

    #[test]
    fn field_prefix_group_value() {
        assert_eq!(
            tokenize("field:title:(a OR b)"),
            vec![
                Token::FieldPrefix {
                    field: "title".into(),
                    value: None,
                },
                Token::LParen,
                term("a"),
                Token::Or,
                term("b"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn field_prefix_value_keeps_colons() {
        assert_eq!(
            tokenize("field:url:https://example.com"),
            vec![Token::FieldPrefix {
                field: "url".into(),
                value: Some("https://example.com".into()),
            }]
        );
    }

    #[test]
    fn dangling_field_prefix_is_a_term() {
        // The value is missing and no phrase or group follows.
        assert_eq!(tokenize("field:title:"), vec![term("field:title:")]);
        assert_eq!(
            tokenize("field:title: guide"),
            vec![term("field:title:"), term("guide")]
        );
    }

    #[test]
    fn exact_prefix() {
        assert_eq!(
            tokenize("exact:category:help"),
            vec![Token::ExactPrefix {
                field: "category".into(),
                value: Some("help".into()),
            }]
        );
    }

    #[test]
    fn exact_prefix_group_is_not_a_value() {
        // Groups are only valid after field scopes.
        assert_eq!(
            tokenize("exact:category:(a)"),
            vec![
                term("exact:category:"),
                Token::LParen,
                term("a"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn range_prefix() {
        assert_eq!(
            tokenize("range:clicks:gte:100"),
            vec![Token::RangePrefix {
                field: "clicks".into(),
                op: RangeOp::Gte,
                value: Some("100".into()),
            }]
        );
    }

    #[test]
    fn range_with_invalid_op_is_a_term() {
        assert_eq!(
            tokenize("range:clicks:eq:100"),
            vec![term("range:clicks:eq:100")]
        );
    }

    #[test]
    fn range_with_missing_parts_is_a_term() {
        assert_eq!(tokenize("range:clicks"), vec![term("range:clicks")]);
        assert_eq!(
            tokenize("range:clicks:gte"),
            vec![term("range:clicks:gte")]
        );
    }

    #[test]
    fn colon_words_are_plain_terms() {
        assert_eq!(
            tokenize("http://example.com"),
            vec![term("http://example.com")]
        );
        assert_eq!(tokenize("12:30"), vec![term("12:30")]);
    }

    #[test]
    fn complex_query() {
        assert_eq!(
            tokenize("field:title:guide (firefox OR fenix) NOT \"crash report\""),
            vec![
                Token::FieldPrefix {
                    field: "title".into(),
                    value: Some("guide".into()),
                },
                Token::LParen,
                term("firefox"),
                Token::Or,
                term("fenix"),
                Token::RParen,
                Token::Not,
                Token::Phrase("crash report".into()),
            ]
        );
    }

    #[test]
    fn extra_whitespace() {
        assert_eq!(
            tokenize("  firefox   crash  "),
            vec![term("firefox"), term("crash")]
        );
    }
}
