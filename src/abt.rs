//! Abstract binding trees with hygienic, nominal binders.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use derive_more::From;
use indexmap::IndexSet;

use crate::name::Name;
use crate::syntax::{Field, Kind, Shape};

#[derive(Clone)]
pub enum Term {
    Var(Name),
    Node(Node),
    Lit(Literal),
}

/// Number and string atoms. Only produced by the parser when a language
/// enables literals, or built directly by callers.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Literal {
    Number(String),
    Str(String),
}

/// An instance of a declared kind: one slot per non-literal field, in
/// declaration order.
#[derive(Clone)]
pub struct Node {
    kind: Arc<Kind>,
    slots: Vec<Slot>,
}

#[derive(Clone, From)]
pub enum Slot {
    Term(Term),
    Binder(Binder),
}

#[derive(Clone)]
pub struct Binder {
    name: Name,
    body: Box<Term>,
}

/// One field of a node together with what fills it.
pub(crate) enum Piece<'t> {
    Literal,
    Term(&'t Term),
    Binder(&'t Binder),
}

/// Pairs of names bound by the two sides of an alpha-equivalence check,
/// innermost first.
enum Scope<'a> {
    Cons {
        left: &'a Name,
        right: &'a Name,
        tail: &'a Scope<'a>,
    },
    Nil,
}

impl<'a> Scope<'a> {
    fn same(&self, left: &Name, right: &Name) -> bool {
        match self {
            Scope::Cons {
                left: l,
                right: r,
                tail,
            } => {
                if *l == left || *r == right {
                    *l == left && *r == right
                } else {
                    tail.same(left, right)
                }
            }
            Scope::Nil => left == right,
        }
    }
}

impl Term {
    pub fn var(name: Name) -> Self {
        Term::Var(name)
    }

    pub fn as_var(&self) -> Option<&Name> {
        match self {
            Term::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Term::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The slots of this term if it is a node of `kind`.
    pub fn view(&self, kind: &Arc<Kind>) -> Option<&[Slot]> {
        match self {
            Term::Node(node) if Arc::ptr_eq(&node.kind, kind) => Some(&node.slots),
            _ => None,
        }
    }

    /// Renames every binder to a fresh name and applies `renaming` to the
    /// variables it covers.
    pub fn fresh(&self, renaming: &HashMap<Name, Name>) -> Term {
        match self {
            Term::Var(x) => Term::Var(renaming.get(x).unwrap_or(x).clone()),
            Term::Node(node) => node.map(|slot| slot.fresh(renaming)),
            Term::Lit(_) => self.clone(),
        }
    }

    /// Capture-avoiding substitution.
    pub fn subst(&self, substitution: &HashMap<Name, Term>) -> Term {
        match self {
            Term::Var(x) => substitution.get(x).unwrap_or(self).clone(),
            Term::Node(node) => node.map(|slot| slot.subst(substitution)),
            Term::Lit(_) => self.clone(),
        }
    }

    /// Alpha-equivalence.
    pub fn equals(&self, other: &Term) -> bool {
        self.equals_in(other, &Scope::Nil)
    }

    fn equals_in(&self, other: &Term, scope: &Scope) -> bool {
        match (self, other) {
            (Term::Var(x), Term::Var(y)) => scope.same(x, y),
            (Term::Node(m), Term::Node(n)) => {
                Arc::ptr_eq(&m.kind, &n.kind)
                    && m.slots.len() == n.slots.len()
                    && m
                        .slots
                        .iter()
                        .zip(n.slots.iter())
                        .all(|(s, t)| s.equals_in(t, scope))
            }
            (Term::Lit(a), Term::Lit(b)) => a == b,
            _ => false,
        }
    }

    pub fn free_names(&self) -> IndexSet<Name> {
        match self {
            Term::Var(x) => [x.clone()].into_iter().collect(),
            Term::Node(node) => node.slots.iter().flat_map(Slot::free_names).collect(),
            Term::Lit(_) => IndexSet::new(),
        }
    }

    /// Gives every binder the simplest display name that neither captures a
    /// free variable nor is shadowed by an enclosing binder.
    pub fn simplify_names(&self) -> Term {
        self.simplify_in(&HashMap::new(), &HashSet::new())
    }

    fn simplify_in(&self, renaming: &HashMap<Name, Name>, reserved: &HashSet<String>) -> Term {
        match self {
            Term::Var(x) => Term::Var(renaming.get(x).unwrap_or(x).clone()),
            Term::Node(node) => node.map(|slot| match slot {
                Slot::Term(t) => Slot::Term(t.simplify_in(renaming, reserved)),
                Slot::Binder(b) => Slot::Binder(b.simplify_in(renaming, reserved)),
            }),
            Term::Lit(_) => self.clone(),
        }
    }

    /// A hash that agrees with [`Term::equals`]: bound occurrences hash by
    /// the distance to their binder, not by name.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_in(&mut Vec::new(), &mut hasher);
        hasher.finish()
    }

    fn hash_in<'t>(&'t self, bound: &mut Vec<&'t Name>, state: &mut DefaultHasher) {
        match self {
            Term::Var(x) => match bound.iter().rposition(|b| *b == x) {
                Some(i) => (0u8, bound.len() - i).hash(state),
                None => (1u8, x).hash(state),
            },
            Term::Node(node) => {
                (2u8, node.kind.name()).hash(state);
                for slot in node.slots.iter() {
                    match slot {
                        Slot::Term(t) => t.hash_in(bound, state),
                        Slot::Binder(b) => {
                            bound.push(&b.name);
                            b.body.hash_in(bound, state);
                            bound.pop();
                        }
                    }
                }
            }
            Term::Lit(l) => (3u8, l).hash(state),
        }
    }
}

impl Node {
    pub(crate) fn new(kind: Arc<Kind>, slots: Vec<Slot>) -> Self {
        Node { kind, slots }
    }

    pub fn kind(&self) -> &Arc<Kind> {
        &self.kind
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The slot filling the non-literal field called `name`.
    pub fn field(&self, name: &str) -> Option<&Slot> {
        self.kind
            .fields()
            .iter()
            .filter(|f| !matches!(f.shape(), Shape::Literal(_)))
            .position(|f| f.name() == name)
            .and_then(|i| self.slots.get(i))
    }

    /// Every declared field, literal or not, paired with its content.
    pub(crate) fn pieces(&self) -> Vec<(&Field, Piece<'_>)> {
        let mut slots = self.slots.iter();
        self.kind
            .fields()
            .iter()
            .map(|field| {
                let piece = match field.shape() {
                    Shape::Literal(_) => Piece::Literal,
                    _ => match slots.next() {
                        Some(Slot::Term(t)) => Piece::Term(t),
                        Some(Slot::Binder(b)) => Piece::Binder(b),
                        None => Piece::Literal,
                    },
                };
                (field, piece)
            })
            .collect()
    }

    fn map(&self, f: impl FnMut(&Slot) -> Slot) -> Term {
        Term::Node(Node {
            kind: self.kind.clone(),
            slots: self.slots.iter().map(f).collect(),
        })
    }
}

impl Slot {
    pub fn term(&self) -> Option<&Term> {
        match self {
            Slot::Term(t) => Some(t),
            _ => None,
        }
    }

    pub fn binder(&self) -> Option<&Binder> {
        match self {
            Slot::Binder(b) => Some(b),
            _ => None,
        }
    }

    fn fresh(&self, renaming: &HashMap<Name, Name>) -> Slot {
        match self {
            Slot::Term(t) => Slot::Term(t.fresh(renaming)),
            Slot::Binder(b) => Slot::Binder(b.fresh(renaming)),
        }
    }

    fn subst(&self, substitution: &HashMap<Name, Term>) -> Slot {
        match self {
            Slot::Term(t) => Slot::Term(t.subst(substitution)),
            Slot::Binder(b) => Slot::Binder(b.subst(substitution)),
        }
    }

    fn equals_in(&self, other: &Slot, scope: &Scope) -> bool {
        match (self, other) {
            (Slot::Term(s), Slot::Term(t)) => s.equals_in(t, scope),
            (Slot::Binder(a), Slot::Binder(b)) => {
                let scope = Scope::Cons {
                    left: &a.name,
                    right: &b.name,
                    tail: scope,
                };
                a.body.equals_in(&b.body, &scope)
            }
            _ => false,
        }
    }

    fn free_names(&self) -> IndexSet<Name> {
        match self {
            Slot::Term(t) => t.free_names(),
            Slot::Binder(b) => b.free_names(),
        }
    }
}

impl Binder {
    /// Binds a fresh name tagged `tag` over the body built from its
    /// occurrence.
    pub fn create(tag: &str, body: impl FnOnce(Term) -> Term) -> Self {
        let name = Name::fresh(tag);
        let body = body(Term::Var(name.clone()));
        Binder::new(name, body)
    }

    /// Binds `name` as given, without freshening. Used by the parser and to
    /// rebuild a binder from the pair returned by [`Binder::open`].
    pub fn new(name: Name, body: Term) -> Self {
        Binder {
            name,
            body: Box::new(body),
        }
    }

    /// A freshly renamed copy of the bound name and body. Each call yields
    /// a name no other call has returned.
    pub fn open(&self) -> (Name, Term) {
        let name = self.name.refresh();
        let renaming = [(self.name.clone(), name.clone())].into_iter().collect();
        (name, self.body.fresh(&renaming))
    }

    pub(crate) fn name(&self) -> &Name {
        &self.name
    }

    pub(crate) fn body(&self) -> &Term {
        &self.body
    }

    fn fresh(&self, renaming: &HashMap<Name, Name>) -> Binder {
        let name = self.name.refresh();
        let mut renaming = renaming.clone();
        renaming.insert(self.name.clone(), name.clone());
        Binder::new(name, self.body.fresh(&renaming))
    }

    fn subst(&self, substitution: &HashMap<Name, Term>) -> Binder {
        // always refresh: a replacement may mention a name equal to ours
        let name = self.name.refresh();
        let mut substitution = substitution.clone();
        substitution.insert(self.name.clone(), Term::Var(name.clone()));
        Binder::new(name, self.body.subst(&substitution))
    }

    pub fn free_names(&self) -> IndexSet<Name> {
        let mut names = self.body.free_names();
        names.shift_remove(&self.name);
        names
    }

    /// Names are reserved by how they print: a plain `y@0` read back from
    /// text and `y` with disambiguator 0 must not both be in scope.
    fn simplify_in(&self, renaming: &HashMap<Name, Name>, reserved: &HashSet<String>) -> Binder {
        let mut reserved = reserved.clone();
        reserved.extend(
            self.free_names()
                .iter()
                .map(|x| renaming.get(x).unwrap_or(x).to_string()),
        );
        let name = [None]
            .into_iter()
            .chain((0..).map(Some))
            .map(|n| self.name.with_disambiguator(n))
            .find(|candidate| !reserved.contains(&candidate.to_string()))
            .unwrap_or_else(|| self.name.refresh());
        let mut renaming = renaming.clone();
        renaming.insert(self.name.clone(), name.clone());
        reserved.insert(name.to_string());
        Binder::new(name, self.body.simplify_in(&renaming, &reserved))
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(x) => write!(f, "Var({x})"),
            Term::Node(node) => {
                write!(f, "{}", node.kind.name())?;
                if node.slots.is_empty() {
                    return Ok(());
                }
                let mut tuple = f.debug_tuple("");
                for slot in node.slots.iter() {
                    tuple.field(slot);
                }
                tuple.finish()
            }
            Term::Lit(l) => write!(f, "{l:?}"),
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Term(t) => t.fmt(f),
            Slot::Binder(b) => b.fmt(f),
        }
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {:?}", self.name, self.body)
    }
}
