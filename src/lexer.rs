use derive_new::new;
use indexmap::IndexSet;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Class {
    /// `[A-Za-z_][A-Za-z0-9_]*`, optionally followed by `@digits`.
    Ident,
    Number,
    /// A quoted string; the token text is the unescaped contents.
    Str,
    Punct,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, new)]
pub struct Token {
    pub class: Class,
    pub text: String,
}

/// How runs of punctuation are split.
#[derive(Clone, Copy)]
enum Punct<'a> {
    /// Longest known operator at each position, else one character.
    Known(&'a IndexSet<String>),
    /// Maximal runs, used to split literal spellings.
    Runs,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_punct(c: char) -> bool {
    !(is_ident(c) || c.is_whitespace() || c == '(' || c == ')' || c == '"')
}

/// Splits `input` into tokens. `None` on an unterminated string or an
/// escape other than `\"` and `\\`.
pub fn tokenize(input: &str, operators: &IndexSet<String>) -> Option<Vec<Token>> {
    scan(input, Punct::Known(operators))
}

/// The token texts of a literal spelling; whitespace only separates.
pub fn spelling_tokens(spelling: &str) -> Vec<String> {
    scan(spelling, Punct::Runs)
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.text)
        .collect()
}

fn scan(input: &str, punct: Punct) -> Option<Vec<Token>> {
    let chars = input.chars().collect::<Vec<_>>();
    let mut tokens = vec![];
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let class = if c.is_whitespace() {
            i += 1;
            continue;
        } else if is_ident_start(c) {
            while i < chars.len() && is_ident(chars[i]) {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == '@' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            Class::Ident
        } else if c.is_ascii_digit() {
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            Class::Number
        } else if c == '"' && matches!(punct, Punct::Known(_)) {
            let mut text = String::new();
            i += 1;
            loop {
                match *chars.get(i)? {
                    '"' => break,
                    '\\' => {
                        // only the escapes the printer writes
                        match *chars.get(i + 1)? {
                            c @ ('"' | '\\') => text.push(c),
                            _ => return None,
                        }
                        i += 2;
                    }
                    c => {
                        text.push(c);
                        i += 1;
                    }
                }
            }
            i += 1;
            tokens.push(Token::new(Class::Str, text));
            continue;
        } else if c == '(' || c == ')' {
            i += 1;
            Class::Punct
        } else {
            let len = match punct {
                Punct::Known(operators) => operators
                    .iter()
                    .map(|op| op.chars().collect::<Vec<_>>())
                    .filter(|op| chars[i..].starts_with(op))
                    .map(|op| op.len())
                    .max()
                    .unwrap_or(1),
                Punct::Runs => chars[i..]
                    .iter()
                    .take_while(|&&c| is_punct(c) || c == '"')
                    .count(),
            };
            i += len;
            Class::Punct
        };
        tokens.push(Token::new(class, chars[start..i].iter().collect()));
    }
    Some(tokens)
}
