//! Declaring kinds and owning the shared precedence order and grammar.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use log::debug;
use once_cell::sync::Lazy;

use crate::abt::{Node, Slot, Term};
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::parse;
use crate::poset::{Cursor, Poset};
use crate::pretty::{self, parens, Bracketer, Mode, Spelling};

#[derive(Clone, Debug)]
pub enum Shape {
    Term,
    /// A bound name and its scope, written `name <separator> body`.
    Binder(Spelling),
    Literal(Spelling),
}

#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    shape: Shape,
    exit: Cursor,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The cursor position right after this field.
    pub fn exit(&self) -> &Cursor {
        &self.exit
    }
}

/// A declared term constructor.
pub struct Kind {
    name: String,
    entry: Cursor,
    fields: Vec<Field>,
    bracketers: IndexMap<Mode, Bracketer>,
}

impl Kind {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cursor position left of the whole rendering.
    pub fn entry(&self) -> &Cursor {
        &self.entry
    }

    pub fn exit(&self, field: &str) -> Option<&Cursor> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| &f.exit)
    }

    pub(crate) fn last_exit(&self) -> &Cursor {
        // declarations are never empty
        self.fields.last().map_or(&self.entry, |f| &f.exit)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) fn bracket(&self, mode: Mode, text: &str) -> String {
        match self.bracketers.get(&mode) {
            Some(bracketer) if mode != Mode::DEFAULT => bracketer(mode, text),
            _ => parens(text),
        }
    }

    /// Positional constructor over the non-literal fields.
    pub fn apply(self: &Arc<Self>, slots: Vec<Slot>) -> Result<Term> {
        let shapes = self
            .fields
            .iter()
            .filter(|f| !matches!(f.shape, Shape::Literal(_)))
            .collect::<Vec<_>>();
        if shapes.len() != slots.len() {
            return Err(Error::InvalidConstruction(format!(
                "{} takes {} fields, got {}",
                self.name,
                shapes.len(),
                slots.len()
            )));
        }
        for (field, slot) in shapes.iter().zip(slots.iter()) {
            match (&field.shape, slot) {
                (Shape::Term, Slot::Term(_)) | (Shape::Binder(_), Slot::Binder(_)) => {}
                (Shape::Term, _) => {
                    return Err(Error::InvalidConstruction(format!(
                        "{}.{} expects a term",
                        self.name, field.name
                    )))
                }
                _ => {
                    return Err(Error::InvalidConstruction(format!(
                        "{}.{} expects a binder",
                        self.name, field.name
                    )))
                }
            }
        }
        Ok(Term::Node(Node::new(self.clone(), slots)))
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kind")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Ordered field descriptors for one kind.
///
/// ```
/// use mixfix_abt::{Decl, Spelling};
/// let plus = Decl::new("Plus").term("p").literal("plus", Spelling::new(" + ")).term("q");
/// ```
pub struct Decl {
    name: String,
    fields: Vec<(String, Shape)>,
    bracketers: IndexMap<Mode, Bracketer>,
}

impl Decl {
    pub fn new(name: &str) -> Self {
        Decl {
            name: name.to_owned(),
            fields: vec![],
            bracketers: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn term(self, field: &str) -> Self {
        self.field(field, Shape::Term)
    }

    /// A binder field using `.` as separator (`. ` outside the default mode).
    pub fn binder(self, field: &str) -> Self {
        self.field(field, Shape::Binder(Spelling::new(".").otherwise(". ")))
    }

    pub fn binder_with(self, field: &str, separator: Spelling) -> Self {
        self.field(field, Shape::Binder(separator))
    }

    pub fn literal(self, field: &str, spelling: Spelling) -> Self {
        self.field(field, Shape::Literal(spelling))
    }

    /// Brackets used in `mode` instead of parentheses. The default mode
    /// always uses parentheses, since the parser relies on them.
    pub fn bracket(
        mut self,
        mode: Mode,
        bracketer: impl Fn(Mode, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.bracketers.insert(mode, Arc::new(bracketer));
        self
    }

    fn field(mut self, field: &str, shape: Shape) -> Self {
        self.fields.push((field.to_owned(), shape));
        self
    }

    fn build(self) -> Result<Kind> {
        let invalid = |why: String| Err(Error::InvalidConstruction(why));
        if self.fields.is_empty() {
            return invalid(format!("{} declares no fields", self.name));
        }
        if self.bracketers.contains_key(&Mode::DEFAULT) {
            return invalid(format!("{} overrides the default bracketer", self.name));
        }
        let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len());
        for (name, shape) in self.fields {
            if name.is_empty() || fields.iter().any(|f| f.name == name) {
                return invalid(format!("{} has a repeated or empty field {name:?}", self.name));
            }
            let exit = Cursor::exit(&self.name, &name);
            fields.push(Field { name, shape, exit });
        }
        Ok(Kind {
            entry: Cursor::entry(&self.name),
            name: self.name,
            fields,
            bracketers: self.bracketers,
        })
    }
}

struct State {
    order: Poset,
    kinds: IndexMap<String, Arc<Kind>>,
    grammar: Grammar,
}

/// A registry of kinds together with the precedence order on their cursor
/// positions and the grammar they induce.
///
/// Declarations take the write lock and replace the grammar with a fully
/// built successor, so rendering and parsing never see a half-registered
/// kind.
pub struct Language {
    state: RwLock<State>,
}

static GLOBAL: Lazy<Language> = Lazy::new(Language::new);

impl Default for Language {
    fn default() -> Self {
        Self::new()
    }
}

impl Language {
    pub fn new() -> Self {
        Language {
            state: RwLock::new(State {
                order: Poset::new(),
                kinds: IndexMap::new(),
                grammar: Grammar::default(),
            }),
        }
    }

    /// The process-wide language.
    pub fn global() -> &'static Language {
        &GLOBAL
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        // writers only ever store complete values, so a poisoned lock still
        // holds a consistent state
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a kind: its cursor positions and its grammar production.
    /// Precedences are declared separately.
    pub fn declare(&self, decl: Decl) -> Result<Arc<Kind>> {
        let mut state = self.write();
        if state.kinds.contains_key(&decl.name) {
            return Err(Error::DeclarationReuse(decl.name));
        }
        let kind = Arc::new(decl.build()?);
        let grammar = state.grammar.with_kind(&kind);
        debug!("declare {} as {}", kind.name, grammar.describe(&kind));

        state.order.insert(kind.entry.clone());
        for field in kind.fields.iter() {
            state.order.insert(field.exit.clone());
        }
        state.grammar = grammar;
        state.kinds.insert(kind.name.clone(), kind.clone());
        Ok(kind)
    }

    /// Lets number and string atoms parse as [`crate::Literal`] terms.
    pub fn enable_literals(&self) {
        let mut state = self.write();
        state.grammar = state.grammar.with_literals();
    }

    pub fn kind(&self, name: &str) -> Option<Arc<Kind>> {
        self.read().kinds.get(name).cloned()
    }

    /// Declares `lo <= hi`.
    pub fn declare_le(&self, lo: &Cursor, hi: &Cursor) {
        self.write().order.add(lo.clone(), hi.clone());
    }

    /// Declares `hi >= lo`: brackets may be dropped where the inner cursor
    /// is `hi` and the outer one is `lo`.
    pub fn declare_ge(&self, hi: &Cursor, lo: &Cursor) {
        self.declare_le(lo, hi)
    }

    pub fn declare_ges(&self, pairs: &[(&Cursor, &Cursor)]) {
        let mut state = self.write();
        for (hi, lo) in pairs {
            state.order.add((*lo).clone(), (*hi).clone());
        }
    }

    pub fn declare_bottom(&self, token: &Cursor) {
        self.write().order.add_bottom(token.clone());
    }

    pub fn declare_top(&self, token: &Cursor) {
        self.write().order.add_top(token.clone());
    }

    pub fn le(&self, lo: &Cursor, hi: &Cursor) -> bool {
        self.read().order.le(lo, hi)
    }

    pub fn render(&self, term: &Term, mode: Mode) -> String {
        pretty::render(term, &self.read().order, mode)
    }

    /// Renders in the default mode, the one the parser reads.
    pub fn show(&self, term: &Term) -> String {
        self.render(term, Mode::DEFAULT)
    }

    /// The unique term whose canonical rendering `input` reduces to.
    pub fn parse(&self, input: &str) -> Result<Term> {
        let state = self.read();
        parse::parse(&state.grammar, &state.order, input)
    }

    /// Every surviving candidate for `input`.
    pub fn parses(&self, input: &str) -> Result<Vec<Term>> {
        let state = self.read();
        parse::parses(&state.grammar, &state.order, input)
    }

    /// A listing of the current grammar.
    pub fn grammar(&self) -> String {
        self.read().grammar.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn pair() -> (Language, Arc<Kind>) {
        let lang = Language::new();
        let pair = lang
            .declare(
                Decl::new("Pair")
                    .literal("open", Spelling::new("<"))
                    .term("fst")
                    .literal("comma", Spelling::new(", "))
                    .term("snd")
                    .literal("close", Spelling::new(">")),
            )
            .unwrap();
        (lang, pair)
    }

    #[test]
    fn redeclaring_is_rejected() {
        let (lang, _) = pair();
        let err = lang.declare(Decl::new("Pair").term("x")).unwrap_err();
        assert!(matches!(err, Error::DeclarationReuse(name) if name == "Pair"));
    }

    #[test]
    fn malformed_declarations_are_rejected() {
        let lang = Language::new();
        assert!(matches!(
            lang.declare(Decl::new("Empty")),
            Err(Error::InvalidConstruction(_))
        ));
        assert!(matches!(
            lang.declare(Decl::new("Twice").term("a").term("a")),
            Err(Error::InvalidConstruction(_))
        ));
        assert!(matches!(
            lang.declare(Decl::new("Brackets").term("a").bracket(Mode::DEFAULT, |_, s| s.into())),
            Err(Error::InvalidConstruction(_))
        ));
        // nothing half-registered
        assert!(lang.kind("Twice").is_none());
        assert_snapshot!(lang.grammar(), @r###"
        term : "(" term ")"
             | IDENT
             | NUMBER
             | STRING
        "###);
    }

    #[test]
    fn global_language_is_shared() {
        let kind = Language::global()
            .declare(Decl::new("GlobalNeg").literal("neg", Spelling::new("~")).term("p"))
            .unwrap();
        assert!(Arc::ptr_eq(
            &kind,
            &Language::global().kind("GlobalNeg").unwrap()
        ));
        // no precedence declared yet
        assert!(Language::global().parse("~~x").is_err());
        let term = Language::global().parse("~(~x)").unwrap();
        assert_eq!("~(~x)", Language::global().show(&term));
    }

    #[test_log::test]
    fn parsing_while_declaring() {
        let (lang, pair) = pair();
        let x = Term::var(crate::Name::plain("x"));
        let expected = pair.apply(vec![x.clone().into(), x.into()]).unwrap();
        let threads = 4;
        let per_thread = 8;

        std::thread::scope(|scope| {
            for t in 0..threads {
                let lang = &lang;
                scope.spawn(move || {
                    for i in 0..per_thread {
                        let keyword = format!("k{t}n{i} ");
                        lang.declare(
                            Decl::new(&format!("K{t}N{i}"))
                                .literal("kw", Spelling::new(&keyword))
                                .term("arg"),
                        )
                        .unwrap();
                    }
                });
            }
            for _ in 0..threads {
                let (lang, expected) = (&lang, &expected);
                scope.spawn(move || {
                    for _ in 0..per_thread {
                        match lang.parse("<x, x>") {
                            Ok(term) => assert!(term.equals(expected)),
                            Err(Error::NoParse { .. }) => {}
                            Err(e) => panic!("{e}"),
                        }
                    }
                });
            }
        });

        for t in 0..threads {
            for i in 0..per_thread {
                let kind = lang.kind(&format!("K{t}N{i}")).unwrap();
                let term = lang.parse(&format!("k{t}n{i} y")).unwrap();
                assert!(term.view(&kind).is_some());
            }
        }
        // one line per base alternative, one per declared kind
        assert_eq!(4 + 1 + threads * per_thread, lang.grammar().lines().count());
        assert!(lang.parse("<x, x>").unwrap().equals(&expected));
    }

    #[test]
    fn cursor_positions() {
        let (lang, pair) = pair();
        assert_eq!("Pair", pair.entry().as_str());
        assert_eq!("Pair.snd", pair.exit("snd").unwrap().as_str());
        assert!(pair.exit("third").is_none());
        assert!(lang.le(&Cursor::bottom(), pair.entry()));
        assert!(!lang.le(pair.entry(), pair.exit("snd").unwrap()));
        lang.declare_ge(pair.exit("snd").unwrap(), pair.entry());
        assert!(lang.le(pair.entry(), pair.exit("snd").unwrap()));

        let open = pair.exit("open").unwrap();
        assert!(!lang.le(open, pair.exit("fst").unwrap()));
        lang.declare_bottom(open);
        assert!(lang.le(open, pair.exit("fst").unwrap()));
        assert!(!lang.le(pair.exit("fst").unwrap(), open));
    }

    #[test]
    fn arity_is_checked() {
        let (_, pair) = pair();
        let x = Term::var(crate::Name::plain("x"));
        assert!(matches!(
            pair.apply(vec![x.clone().into()]),
            Err(Error::InvalidConstruction(_))
        ));
        let binder = crate::Binder::create("y", |y| y);
        assert!(matches!(
            pair.apply(vec![x.clone().into(), binder.into()]),
            Err(Error::InvalidConstruction(_))
        ));
        let ok = pair.apply(vec![x.clone().into(), x.into()]).unwrap();
        assert!(ok.as_node().unwrap().field("snd").is_some());
        assert!(ok.as_node().unwrap().field("comma").is_none());
    }

    #[test]
    fn nested_forms_follow_the_order() {
        let (lang, pair) = pair();
        let x = Term::var(crate::Name::plain("x"));
        let inner = pair.apply(vec![x.clone().into(), x.clone().into()]).unwrap();
        let outer = pair.apply(vec![inner.into(), x.into()]).unwrap();
        assert_snapshot!(lang.show(&outer), @"<(<x, x>), x>");

        let cursor = |field| pair.exit(field).unwrap();
        lang.declare_ges(&[
            (pair.entry(), cursor("open")),
            (cursor("close"), cursor("fst")),
        ]);
        assert_snapshot!(lang.show(&outer), @"<<x, x>, x>");
        assert_snapshot!(lang.grammar(), @r###"
        term : "(" term ")"
             | IDENT
             | NUMBER
             | STRING
             | "<" term "," term ">" -> Pair
        "###);
    }
}
