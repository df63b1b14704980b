// src/glob.rs

//! # Glob Matching
//!
//! Shell-style key patterns as accepted by `KEYS`:
//!
//! - `*` matches any run of characters, including none
//! - `?` matches exactly one character
//! - `[abc]`, `[^abc]`, `[a-z]` match one character from (or outside) a class
//! - `\x` matches `x` literally, so `\[ns\]*` matches keys starting with `[ns]`
//!
//! A pattern is compiled once into a token list and then applied to every
//! candidate. The empty pattern matches nothing. A `[` with no closing `]`
//! is taken as a literal bracket.

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Star,
    Any,
    Literal(char),
    Class { negated: bool, items: Vec<ClassItem> },
}

impl Token {
    fn accepts(&self, c: char) -> bool {
        match self {
            Token::Star | Token::Any => true,
            Token::Literal(l) => *l == c,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match *item {
                    ClassItem::Char(x) => x == c,
                    ClassItem::Range(lo, hi) => lo <= c && c <= hi,
                });
                hit != *negated
            }
        }
    }
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    tokens: Vec<Token>,
}

impl Glob {
    pub fn new(pattern: &str) -> Self {
        Glob {
            tokens: compile(pattern),
        }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        if self.tokens.is_empty() {
            return false;
        }
        let text: Vec<char> = candidate.chars().collect();
        match_tokens(&self.tokens, &text)
    }
}

/// Matches a single key against `pattern`.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    Glob::new(pattern).is_match(candidate)
}

/// Returns the candidates matching `pattern`, in input order.
pub fn filter<I, S>(pattern: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let glob = Glob::new(pattern);
    candidates
        .into_iter()
        .filter(|c| glob.is_match(c.as_ref()))
        .map(|c| c.as_ref().to_string())
        .collect()
}

fn compile(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                // runs of stars collapse into one
                if tokens.last() != Some(&Token::Star) {
                    tokens.push(Token::Star);
                }
                i += 1;
            }
            '?' => {
                tokens.push(Token::Any);
                i += 1;
            }
            '\\' if i + 1 < chars.len() => {
                tokens.push(Token::Literal(chars[i + 1]));
                i += 2;
            }
            '[' => match compile_class(&chars, i) {
                Some((token, next)) => {
                    tokens.push(token);
                    i = next;
                }
                None => {
                    tokens.push(Token::Literal('['));
                    i += 1;
                }
            },
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }
    tokens
}

/// Parses the class opening at `chars[start]`. Returns the token and the
/// index just past the closing `]`, or `None` if the class is never closed.
fn compile_class(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let mut i = start + 1;
    let negated = chars.get(i) == Some(&'^');
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    while i < chars.len() {
        let c = match chars[i] {
            ']' => return Some((Token::Class { negated, items }, i + 1)),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                chars[i]
            }
            c => c,
        };

        if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i + 2] != ']' {
            let (mut lo, mut hi) = (c, chars[i + 2]);
            if lo > hi {
                std::mem::swap(&mut lo, &mut hi);
            }
            items.push(ClassItem::Range(lo, hi));
            i += 3;
        } else {
            items.push(ClassItem::Char(c));
            i += 1;
        }
    }
    None
}

/// Iterative matcher with single-star backtracking.
fn match_tokens(tokens: &[Token], text: &[char]) -> bool {
    let (mut ti, mut si) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while si < text.len() {
        match tokens.get(ti) {
            Some(Token::Star) => {
                star = Some((ti, si));
                ti += 1;
                continue;
            }
            Some(token) if token.accepts(text[si]) => {
                ti += 1;
                si += 1;
                continue;
            }
            _ => {}
        }

        match star {
            Some((star_ti, star_si)) => {
                // let the last star swallow one more character
                ti = star_ti + 1;
                si = star_si + 1;
                star = Some((star_ti, si));
            }
            None => return false,
        }
    }

    tokens[ti..].iter().all(|t| *t == Token::Star)
}
