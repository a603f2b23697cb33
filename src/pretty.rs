//! Rendering terms with as few brackets as the precedence order allows.

use std::sync::Arc;

use derive_more::Display;
use indexmap::IndexMap;

use crate::abt::{Piece, Term};
use crate::poset::{Cursor, Poset};
use crate::syntax::Shape;
use crate::Literal;

/// An output mode. [`Mode::DEFAULT`] is the mode the parser reads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub struct Mode(pub &'static str);

impl Mode {
    pub const DEFAULT: Mode = Mode("default");
}

pub type Bracketer = Arc<dyn Fn(Mode, &str) -> String + Send + Sync>;

pub fn parens(text: &str) -> String {
    format!("({text})")
}

/// How a literal field is written. The parse spelling is used by the
/// grammar and by the default mode; other modes may override it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spelling {
    parse: String,
    modes: IndexMap<Mode, String>,
    otherwise: Option<String>,
}

impl Spelling {
    pub fn new(parse: &str) -> Self {
        Spelling {
            parse: parse.to_owned(),
            modes: IndexMap::new(),
            otherwise: None,
        }
    }

    pub fn mode(mut self, mode: Mode, spelling: &str) -> Self {
        self.modes.insert(mode, spelling.to_owned());
        self
    }

    /// Spelling for every non-default mode without an entry of its own.
    pub fn otherwise(mut self, spelling: &str) -> Self {
        self.otherwise = Some(spelling.to_owned());
        self
    }

    pub fn parse(&self) -> &str {
        &self.parse
    }

    pub fn in_mode(&self, mode: Mode) -> &str {
        if mode == Mode::DEFAULT {
            return &self.parse;
        }
        self.modes
            .get(&mode)
            .or(self.otherwise.as_ref())
            .unwrap_or(&self.parse)
    }
}

pub fn render(term: &Term, order: &Poset, mode: Mode) -> String {
    let mut out = String::new();
    let bottom = Cursor::bottom();
    Printer { order, mode }.term(term, &bottom, &bottom, &mut out);
    out
}

struct Printer<'a> {
    order: &'a Poset,
    mode: Mode,
}

impl<'a> Printer<'a> {
    fn term(&self, term: &Term, left: &Cursor, right: &Cursor, out: &mut String) {
        let node = match term {
            Term::Var(x) => return out.push_str(&x.to_string()),
            Term::Lit(Literal::Number(n)) => return out.push_str(n),
            Term::Lit(Literal::Str(s)) => return out.push_str(&quote(s)),
            Term::Node(node) => node,
        };
        let kind = node.kind();
        // unbracketed iff the parent's bounds sit below this node's own edges
        let bracketing =
            !(self.order.le(left, kind.entry()) && self.order.le(right, kind.last_exit()));

        let bottom = Cursor::bottom();
        let pieces = node.pieces();
        let last = pieces.len() - 1;
        let mut text = String::new();
        let mut prev = if bracketing { &bottom } else { kind.entry() };
        for (i, (field, piece)) in pieces.iter().enumerate() {
            let next = if bracketing && i == last {
                &bottom
            } else {
                field.exit()
            };
            match (field.shape(), piece) {
                (Shape::Literal(spelling), _) => text.push_str(spelling.in_mode(self.mode)),
                (_, Piece::Term(t)) => self.term(t, prev, next, &mut text),
                (Shape::Binder(separator), Piece::Binder(b)) => {
                    text.push_str(&b.name().to_string());
                    text.push_str(separator.in_mode(self.mode));
                    // nothing to the left of a body binds it
                    self.term(b.body(), &bottom, next, &mut text);
                }
                _ => {}
            }
            prev = field.exit();
        }

        if bracketing {
            out.push_str(&kind.bracket(self.mode, &text));
        } else {
            out.push_str(&text);
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
