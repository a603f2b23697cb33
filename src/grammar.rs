//! The single-nonterminal mixfix grammar and exhaustive derivation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexSet;
use log::trace;
use typed_arena::Arena;

use crate::lexer::{spelling_tokens, Class, Token};
use crate::syntax::{Kind, Shape};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Symbol {
    Term,
    Token(String),
}

#[derive(Clone)]
pub struct Production {
    kind: Arc<Kind>,
    symbols: Vec<Symbol>,
}

impl Production {
    fn new(kind: &Arc<Kind>) -> Self {
        let mut symbols = vec![];
        for field in kind.fields() {
            match field.shape() {
                Shape::Term => symbols.push(Symbol::Term),
                Shape::Binder(separator) => {
                    symbols.push(Symbol::Term);
                    symbols.extend(spelling_tokens(separator.parse()).into_iter().map(Symbol::Token));
                    symbols.push(Symbol::Term);
                }
                Shape::Literal(spelling) => {
                    symbols.extend(spelling_tokens(spelling.parse()).into_iter().map(Symbol::Token))
                }
            }
        }
        Production {
            kind: kind.clone(),
            symbols,
        }
    }

    pub fn kind(&self) -> &Arc<Kind> {
        &self.kind
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, symbol) in self.symbols.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match symbol {
                Symbol::Term => write!(f, "term")?,
                Symbol::Token(t) => write!(f, "{t:?}")?,
            }
        }
        write!(f, " -> {}", self.kind.name())
    }
}

/// Productions plus the settings the transformer needs; replaced as a
/// whole on every declaration.
#[derive(Clone, Default)]
pub struct Grammar {
    productions: Vec<Production>,
    operators: IndexSet<String>,
    literals: bool,
}

impl Grammar {
    pub fn with_kind(&self, kind: &Arc<Kind>) -> Grammar {
        let production = Production::new(kind);
        let mut grammar = self.clone();
        for symbol in production.symbols.iter() {
            if let Symbol::Token(t) = symbol {
                if t.chars().all(|c| !c.is_ascii_alphanumeric() && c != '_') {
                    grammar.operators.insert(t.clone());
                }
            }
        }
        grammar.productions.push(production);
        grammar
    }

    pub fn with_literals(&self) -> Grammar {
        Grammar {
            literals: true,
            ..self.clone()
        }
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Punctuation tokens occurring in spellings, for longest-match lexing.
    pub fn operators(&self) -> &IndexSet<String> {
        &self.operators
    }

    pub fn literals(&self) -> bool {
        self.literals
    }

    /// The production `kind` would add, as listed by `Display`.
    pub fn describe(&self, kind: &Arc<Kind>) -> String {
        Production::new(kind).to_string()
    }

    /// Every distinct derivation of `term` over all of `tokens`.
    pub fn derive_all<'a>(
        &self,
        arena: &'a Arena<Derivation<'a>>,
        tokens: &'a [Token],
    ) -> Vec<&'a Derivation<'a>> {
        let mut forest = Forest {
            grammar: self,
            arena,
            tokens,
            memo: HashMap::new(),
            active: HashSet::new(),
        };
        forest.derive(0, tokens.len()).to_vec()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "term : \"(\" term \")\"")?;
        writeln!(f, "     | IDENT")?;
        writeln!(f, "     | NUMBER")?;
        write!(f, "     | STRING")?;
        for production in self.productions.iter() {
            write!(f, "\n     | {production}")?;
        }
        Ok(())
    }
}

#[derive(PartialEq, Eq, Hash, Debug)]
pub enum Derivation<'a> {
    Paren(&'a Derivation<'a>),
    Ident(&'a str),
    Number(&'a str),
    Str(&'a str),
    /// Children are the `term` symbols of the production, in order.
    Node {
        production: usize,
        children: Vec<&'a Derivation<'a>>,
    },
}

type Derivations<'a> = Rc<Vec<&'a Derivation<'a>>>;

struct Forest<'g, 'a> {
    grammar: &'g Grammar,
    arena: &'a Arena<Derivation<'a>>,
    tokens: &'a [Token],
    memo: HashMap<(usize, usize), Derivations<'a>>,
    active: HashSet<(usize, usize)>,
}

impl<'g, 'a> Forest<'g, 'a> {
    /// Derivations of `term` over `tokens[start..end]`.
    fn derive(&mut self, start: usize, end: usize) -> Derivations<'a> {
        if let Some(found) = self.memo.get(&(start, end)) {
            return found.clone();
        }
        if !self.active.insert((start, end)) {
            // a cycle through an empty or unit production adds nothing new
            trace!("cut cyclic derivation over {start}..{end}");
            return Rc::new(vec![]);
        }

        let mut found: IndexSet<&'a Derivation<'a>> = IndexSet::new();
        let tokens = self.tokens;
        if end == start + 1 {
            let token = &tokens[start];
            let text = token.text.as_str();
            match token.class {
                Class::Ident => {
                    found.insert(self.arena.alloc(Derivation::Ident(text)));
                }
                Class::Number => {
                    found.insert(self.arena.alloc(Derivation::Number(text)));
                }
                Class::Str => {
                    found.insert(self.arena.alloc(Derivation::Str(text)));
                }
                Class::Punct => {}
            }
        }
        if end >= start + 2 && is_punct(&tokens[start], "(") && is_punct(&tokens[end - 1], ")") {
            for inner in self.derive(start + 1, end - 1).iter() {
                found.insert(self.arena.alloc(Derivation::Paren(*inner)));
            }
        }
        let grammar = self.grammar;
        for (production, rule) in grammar.productions.iter().enumerate() {
            for children in self.sequence(&rule.symbols, start, end) {
                found.insert(self.arena.alloc(Derivation::Node {
                    production,
                    children,
                }));
            }
        }

        self.active.remove(&(start, end));
        let found: Derivations<'a> = Rc::new(found.into_iter().collect());
        self.memo.insert((start, end), found.clone());
        found
    }

    /// Ways `symbols` can cover `tokens[start..end]`, as the derivations of
    /// their `term` symbols.
    fn sequence(
        &mut self,
        symbols: &[Symbol],
        start: usize,
        end: usize,
    ) -> Vec<Vec<&'a Derivation<'a>>> {
        match symbols.split_first() {
            None if start == end => vec![vec![]],
            None => vec![],
            Some((Symbol::Token(text), rest)) => {
                match self.tokens.get(start) {
                    Some(token) if start < end && token.class != Class::Str && token.text == *text => {
                        self.sequence(rest, start + 1, end)
                    }
                    _ => vec![],
                }
            }
            Some((Symbol::Term, rest)) => {
                let needed = rest
                    .iter()
                    .filter(|s| matches!(s, Symbol::Token(_)))
                    .count();
                let mut out = vec![];
                for split in start..=end.saturating_sub(needed).max(start) {
                    let heads = self.derive(start, split);
                    if heads.is_empty() {
                        continue;
                    }
                    let tails = self.sequence(rest, split, end);
                    for head in heads.iter() {
                        for tail in tails.iter() {
                            let mut children = Vec::with_capacity(tail.len() + 1);
                            children.push(*head);
                            children.extend(tail.iter().copied());
                            out.push(children);
                        }
                    }
                }
                out
            }
        }
    }
}

fn is_punct(token: &Token, text: &str) -> bool {
    token.class == Class::Punct && token.text == text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::{Decl, Language, Spelling};

    fn count(kinds: &[Arc<Kind>], input: &str) -> usize {
        let grammar = kinds
            .iter()
            .fold(Grammar::default(), |g, kind| g.with_kind(kind));
        let tokens = tokenize(input, grammar.operators()).unwrap();
        let arena = Arena::new();
        grammar.derive_all(&arena, &tokens).len()
    }

    #[test]
    fn all_derivations_are_enumerated() {
        let lang = Language::new();
        let add = lang
            .declare(Decl::new("Add").term("l").literal("op", Spelling::new("+")).term("r"))
            .unwrap();
        let kinds = [add];
        assert_eq!(1, count(&kinds, "a"));
        assert_eq!(1, count(&kinds, "a + b"));
        // Catalan numbers
        assert_eq!(2, count(&kinds, "a + b + c"));
        assert_eq!(5, count(&kinds, "a + b + c + d"));
        assert_eq!(1, count(&kinds, "(a + b) + c"));
        assert_eq!(1, count(&kinds, "((a)) + b"));
        assert_eq!(0, count(&kinds, "a +"));
    }

    #[test]
    fn juxtaposition_and_empty_productions() {
        let lang = Language::new();
        let app = lang
            .declare(Decl::new("App").term("f").literal("sp", Spelling::new(" ")).term("x"))
            .unwrap();
        let unit = lang
            .declare(Decl::new("Unit").literal("nothing", Spelling::new("")))
            .unwrap();
        assert_eq!(2, count(&[app.clone()], "f x y"));
        // terminates despite `term -> term term` and `term -> ε`
        assert!(count(&[app, unit], "f x") >= 1);
    }

    #[test]
    fn binder_productions() {
        let lang = Language::new();
        let all = lang
            .declare(Decl::new("All").literal("kw", Spelling::new("all ")).binder("b"))
            .unwrap();
        let grammar = Grammar::default().with_kind(&all);
        assert_eq!(
            r#""all" term "." term -> All"#,
            grammar.productions()[0].to_string()
        );
        let tokens = tokenize("all x. x", grammar.operators()).unwrap();
        let arena = Arena::new();
        let found = grammar.derive_all(&arena, &tokens);
        assert_eq!(1, found.len());
        assert!(matches!(
            found[0],
            Derivation::Node { production: 0, children } if children.len() == 2
        ));
    }
}
