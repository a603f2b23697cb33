//! Example languages: arithmetic, first-order formulas and the untyped
//! lambda calculus, all declared in one shared [`Language`].

pub mod lambda;
pub mod logic;

use std::sync::Arc;

use anyhow::{Context, Result};
use derive_more::Deref;
use once_cell::sync::Lazy;

use crate::abt::{Binder, Node, Slot, Term};
use crate::pretty::{Mode, Spelling};
use crate::syntax::{Decl, Kind, Language};

pub const PRETTY: Mode = Mode("pretty");
pub const TEX: Mode = Mode("tex");

pub struct Kinds {
    pub top: Arc<Kind>,
    pub times: Arc<Kind>,
    pub plus: Arc<Kind>,
    pub pow: Arc<Kind>,
    pub forall: Arc<Kind>,
    pub exists: Arc<Kind>,
    pub eq: Arc<Kind>,
    pub lam: Arc<Kind>,
    pub app: Arc<Kind>,
}

#[derive(Deref)]
pub struct Mock {
    #[deref]
    lang: Language,
    pub kinds: Kinds,
}

static MOCK: Lazy<Mock> = Lazy::new(|| Mock::declare().expect("example language"));

pub fn lang() -> &'static Mock {
    &MOCK
}

fn tex_parens(_: Mode, text: &str) -> String {
    format!("\\left({text}\\right)")
}

fn infix(name: &str, op: &str, spelling: &str) -> Decl {
    Decl::new(name)
        .term("p")
        .literal(op, Spelling::new(spelling))
        .term("q")
}

fn quantifier(name: &str, word: &str, pretty: &str, tex: &str) -> Decl {
    Decl::new(name)
        .literal(
            "quantifier",
            Spelling::new(&format!("{word} "))
                .mode(PRETTY, &format!("{pretty} "))
                .mode(TEX, &format!("{tex} ")),
        )
        .binder("xp")
}

impl Mock {
    fn declare() -> Result<Mock> {
        let lang = Language::new();
        let declare = |decl: Decl| -> Result<Arc<Kind>> {
            let name = decl.name().to_owned();
            lang.declare(decl).with_context(|| format!("declaring {name}"))
        };

        let kinds = Kinds {
            top: declare(Decl::new("Top").literal("s", Spelling::new("1")))?,
            times: declare(infix("Times", "times", " * "))?,
            plus: declare(infix("Plus", "plus", " + "))?,
            pow: declare(infix("Pow", "to", " -> "))?,
            forall: declare(quantifier("Forall", "forall", "∀", "\\forall"))?,
            exists: declare(quantifier("Exists", "exists", "∃", "\\exists"))?,
            eq: declare(
                Decl::new("Eq")
                    .term("m")
                    .literal("eq", Spelling::new(" = "))
                    .term("n"),
            )?,
            lam: declare(
                Decl::new("Lam")
                    .literal(
                        "lam",
                        Spelling::new("\\")
                            .mode(PRETTY, "λ")
                            .mode(TEX, "\\lambda "),
                    )
                    .binder("m")
                    .bracket(TEX, tex_parens),
            )?,
            app: declare(
                Decl::new("App")
                    .term("m")
                    .literal("sp", Spelling::new(" "))
                    .term("n")
                    .bracket(TEX, tex_parens),
            )?,
        };

        let k = &kinds;
        let exit = |kind: &Arc<Kind>, field: &str| -> Result<_> {
            kind.exit(field)
                .cloned()
                .with_context(|| format!("{} has no field {field}", kind.name()))
        };

        lang.declare_top(k.top.entry());
        lang.declare_top(&exit(&k.top, "s")?);

        // * and + associate to the right, * binds tighter
        lang.declare_ges(&[
            (k.times.entry(), &exit(&k.times, "times")?),
            (k.plus.entry(), &exit(&k.plus, "plus")?),
            (k.times.entry(), k.plus.entry()),
            (&exit(&k.times, "q")?, &exit(&k.plus, "p")?),
            (&exit(&k.times, "q")?, &exit(&k.plus, "q")?),
        ]);
        // -> associates to the right and binds loosest, on its left only
        lang.declare_ges(&[
            (k.pow.entry(), &exit(&k.pow, "to")?),
            (k.plus.entry(), k.pow.entry()),
            (&exit(&k.plus, "q")?, &exit(&k.pow, "p")?),
        ]);
        // quantifier bodies extend as far right as possible
        lang.declare_ges(&[
            (&exit(&k.forall, "xp")?, &exit(&k.exists, "xp")?),
            (&exit(&k.exists, "xp")?, &exit(&k.forall, "xp")?),
            (&exit(&k.eq, "n")?, &exit(&k.exists, "xp")?),
            (&exit(&k.times, "q")?, &exit(&k.exists, "xp")?),
        ]);
        // application associates to the left, lambda bodies extend right
        lang.declare_ges(&[
            (&exit(&k.app, "n")?, &exit(&k.app, "m")?),
            (&exit(&k.app, "n")?, &exit(&k.lam, "m")?),
        ]);

        Ok(Mock { lang, kinds })
    }

    pub fn top(&self) -> Term {
        node(&self.kinds.top, vec![])
    }

    pub fn times(&self, p: Term, q: Term) -> Term {
        node(&self.kinds.times, vec![p.into(), q.into()])
    }

    pub fn plus(&self, p: Term, q: Term) -> Term {
        node(&self.kinds.plus, vec![p.into(), q.into()])
    }

    pub fn pow(&self, p: Term, q: Term) -> Term {
        node(&self.kinds.pow, vec![p.into(), q.into()])
    }

    pub fn eq(&self, m: Term, n: Term) -> Term {
        node(&self.kinds.eq, vec![m.into(), n.into()])
    }

    pub fn forall(&self, tag: &str, body: impl FnOnce(Term) -> Term) -> Term {
        node(&self.kinds.forall, vec![Binder::create(tag, body).into()])
    }

    pub fn exists(&self, tag: &str, body: impl FnOnce(Term) -> Term) -> Term {
        node(&self.kinds.exists, vec![Binder::create(tag, body).into()])
    }

    pub fn lam(&self, tag: &str, body: impl FnOnce(Term) -> Term) -> Term {
        node(&self.kinds.lam, vec![Binder::create(tag, body).into()])
    }

    pub fn app(&self, m: Term, n: Term) -> Term {
        node(&self.kinds.app, vec![m.into(), n.into()])
    }
}

/// The helpers above always pass the declared number of slots.
pub(crate) fn node(kind: &Arc<Kind>, slots: Vec<Slot>) -> Term {
    Term::Node(Node::new(kind.clone(), slots))
}
