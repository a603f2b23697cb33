//! Picking the one derivation whose canonical rendering matches the input.

use log::{debug, trace};
use typed_arena::Arena;

use crate::abt::{Binder, Slot, Term};
use crate::error::{Error, Result};
use crate::grammar::{Derivation, Grammar};
use crate::lexer::tokenize;
use crate::name::Name;
use crate::poset::Poset;
use crate::pretty::{render, Mode};
use crate::syntax::Shape;
use crate::Literal;

pub(crate) fn parse(grammar: &Grammar, order: &Poset, input: &str) -> Result<Term> {
    let mut candidates = parses(grammar, order, input)?;
    match candidates.len() {
        0 => Err(Error::NoParse {
            input: input.to_owned(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(Error::AmbiguousParse {
            input: input.to_owned(),
            candidates,
        }),
    }
}

/// All surviving candidates, alpha-equivalent duplicates removed. Fails
/// only when the input has no derivation at all.
pub(crate) fn parses(grammar: &Grammar, order: &Poset, input: &str) -> Result<Vec<Term>> {
    let no_parse = || Error::NoParse {
        input: input.to_owned(),
    };
    let tokens = tokenize(input, grammar.operators()).ok_or_else(no_parse)?;
    let arena = Arena::new();
    let derivations = grammar.derive_all(&arena, &tokens);
    if derivations.is_empty() {
        return Err(no_parse());
    }

    let mut survivors: Vec<Term> = vec![];
    for derivation in derivations.iter() {
        let term = match build(grammar, derivation) {
            Some(term) => term,
            None => {
                trace!("rejected derivation {derivation:?}");
                continue;
            }
        };
        let canonical = render(&term, order, Mode::DEFAULT);
        if !reduces_to(input, &canonical) {
            trace!("{input:?} does not reduce to {canonical:?}");
            continue;
        }
        if !survivors.iter().any(|t| t.equals(&term)) {
            survivors.push(term);
        }
    }
    debug!(
        "{input:?}: {} derivations, {} survivors",
        derivations.len(),
        survivors.len()
    );
    Ok(survivors)
}

/// The term a derivation stands for, or `None` if it does not build one:
/// a binder position holding anything but a variable, a literal atom in a
/// language without literals, or a node the kind refuses.
fn build(grammar: &Grammar, derivation: &Derivation) -> Option<Term> {
    match derivation {
        Derivation::Paren(inner) => build(grammar, inner),
        Derivation::Ident(text) => Some(Term::var(Name::plain(text))),
        Derivation::Number(text) if grammar.literals() => {
            Some(Term::Lit(Literal::Number((*text).to_owned())))
        }
        Derivation::Str(text) if grammar.literals() => {
            Some(Term::Lit(Literal::Str((*text).to_owned())))
        }
        Derivation::Number(_) | Derivation::Str(_) => None,
        Derivation::Node {
            production,
            children,
        } => {
            let kind = grammar.productions().get(*production)?.kind();
            let mut children = children.iter();
            let mut slots = vec![];
            for field in kind.fields() {
                match field.shape() {
                    Shape::Literal(_) => {}
                    Shape::Term => slots.push(Slot::Term(build(grammar, children.next()?)?)),
                    Shape::Binder(_) => {
                        let name = build(grammar, children.next()?)?.as_var()?.clone();
                        let body = build(grammar, children.next()?)?;
                        slots.push(Slot::Binder(Binder::new(name, body)));
                    }
                }
            }
            kind.apply(slots).ok()
        }
    }
}

pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whether `canonical` is `input` with some parentheses deleted, ignoring
/// whitespace on both sides.
pub fn reduces_to(input: &str, canonical: &str) -> bool {
    let is_paren = |c: &char| *c == '(' || *c == ')';
    let input = strip_whitespace(input).chars().collect::<Vec<_>>();
    let canonical = strip_whitespace(canonical).chars().collect::<Vec<_>>();
    let mut i = 0;
    for c in canonical.iter() {
        loop {
            match input.get(i) {
                Some(d) if d == c => break,
                Some(d) if is_paren(d) => i += 1,
                _ => return false,
            }
        }
        i += 1;
    }
    input[i..].iter().all(is_paren)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use insta::{assert_debug_snapshot, assert_snapshot};

    use super::*;
    use crate::mocks::lang;
    use crate::{Decl, Language, Spelling};

    #[test]
    fn reduction() {
        assert!(reduces_to("1 * 1", "1*1"));
        assert!(reduces_to("((1)) * (1)", "1 * 1"));
        assert!(reduces_to("(1 * 1)", "1 * 1"));
        assert!(!reduces_to("1 * 1", "(1 * 1)"));
        assert!(!reduces_to("1 * 1 + 1", "1 * 1"));
        assert!(!reduces_to("1 + 1", "1 * 1"));
    }

    #[test_log::test]
    fn arithmetic() -> Result<()> {
        let l = lang();
        let one = || l.top();
        assert!(l.parse("1")?.equals(&one()));
        assert!(l
            .parse("1 * 1 * 1")?
            .equals(&l.times(one(), l.times(one(), one()))));
        assert!(l
            .parse("(1 * 1) * 1")?
            .equals(&l.times(l.times(one(), one()), one())));
        assert!(l
            .parse("1 * 1 + 1")?
            .equals(&l.plus(l.times(one(), one()), one())));
        assert!(l
            .parse("1 -> (1 + 1)")?
            .equals(&l.pow(one(), l.plus(one(), one()))));
        assert!(l.parse("1 + 1 -> 1")?.equals(&l.pow(l.plus(one(), one()), one())));
        Ok(())
    }

    #[test]
    fn missing_brackets_do_not_parse() {
        let l = lang();
        for input in ["1 -> 1 + 1", "1 -> 1 * 1", "1 * 1 -> 1 -> 1 + 1", "1 +", "* 1"] {
            assert!(
                matches!(l.parse(input), Err(Error::NoParse { .. })),
                "{input} parsed"
            );
        }
    }

    #[test]
    fn superfluous_brackets_and_whitespace() -> Result<()> {
        let l = lang();
        let one = || l.top();
        let expected = l.times(one(), l.times(one(), one()));
        for input in ["1*1*1", "((1)) * (1 * 1)", "(1 *  (1*(1)))", " 1 *1* 1 "] {
            assert!(l.parse(input)?.equals(&expected), "{input}");
        }
        Ok(())
    }

    #[test]
    fn quantifiers() -> Result<()> {
        let l = lang();
        let p = l.forall("x", |x| l.exists("y", |y| l.eq(x, y)));
        let parsed = l.parse("forall x.exists y.x = y")?;
        assert_debug_snapshot!(parsed, @r###"
        Forall(
            x. Exists(y. Eq(Var(x), Var(y))),
        )
        "###);
        assert!(parsed.equals(&p));
        assert!(l.parse("forall x. (exists y. (x = y))")?.equals(&p));
        assert!(l.parse("forall u. exists v. u = v")?.equals(&p));
        assert!(l.parse("forall (x). exists y. x = y")?.equals(&p));
        assert!(!l.parse("forall x.exists y.y = x")?.equals(&p));

        // a binder position holds a variable only
        assert!(l.parse("forall 1. x").is_err());
        // the quantifier would swallow the product
        assert!(l.parse("forall x. x = x * forall y. y = y").is_err());
        let q = l.parse("forall x. (x = x) * (forall y. y = y)")?;
        assert_snapshot!(l.show(&q), @"forall x.(x = x) * (forall y.y = y)");
        Ok(())
    }

    #[test]
    fn lambda_terms() -> Result<()> {
        let l = lang();
        let id = || l.lam("x", |x| x);
        let omega = || l.lam("x", |x| l.app(x.clone(), x));
        assert!(l
            .parse(r"(\x.x x) (\x.x x)")?
            .equals(&l.app(omega(), omega())));
        assert!(l
            .parse(r"(\x.x)(\x.x)(\x.x)")?
            .equals(&l.app(l.app(id(), id()), id())));
        assert!(l
            .parse(r"(\x.x) ((\x.x) (\x.x))")?
            .equals(&l.app(id(), l.app(id(), id()))));
        assert!(l.parse(r"\f.\x.f x")?.equals(&l.lam("f", |f| l.lam("x", |x| l.app(f, x)))));
        // identifiers are lexed greedily
        assert_eq!(Some(&Name::plain("xy")), l.parse("xy")?.as_var());
        assert!(l.parse("x y")?.view(&l.kinds.app).is_some());
        Ok(())
    }

    #[test]
    fn both_ways_associative_is_ambiguous() -> Result<()> {
        let lang = Language::new();
        let op = lang.declare(Decl::new("Op").term("l").literal("op", Spelling::new(" + ")).term("r"))?;
        // right and left associative at once
        lang.declare_ge(op.entry(), op.exit("op").unwrap());
        lang.declare_ge(op.exit("r").unwrap(), op.exit("l").unwrap());

        assert!(lang.parse("a + b").is_ok());
        match lang.parse("a + b + c") {
            Err(Error::AmbiguousParse { candidates, .. }) => {
                assert_eq!(2, candidates.len());
                assert!(!candidates[0].equals(&candidates[1]));
            }
            other => panic!("expected an ambiguity, got {other:?}"),
        }
        assert_eq!(2, lang.parses("a + b + c")?.len());
        assert_eq!(1, lang.parses("(a + b) + c")?.len());
        Ok(())
    }

    #[test]
    fn literal_atoms() -> Result<()> {
        let lang = Language::new();
        let plus = lang.declare(Decl::new("Plus").term("p").literal("plus", Spelling::new(" + ")).term("q"))?;
        assert!(matches!(lang.parse("1 + 2"), Err(Error::NoParse { .. })));

        lang.enable_literals();
        let term = lang.parse(r#"1.5 + "a b""#)?;
        let slots = term.view(&plus).unwrap();
        assert!(matches!(slots[0].term(), Some(Term::Lit(Literal::Number(n))) if n == "1.5"));
        assert!(matches!(slots[1].term(), Some(Term::Lit(Literal::Str(s))) if s == "a b"));
        assert_snapshot!(lang.show(&term), @r###"1.5 + "a b""###);
        assert!(matches!(lang.parse(r#""open"#), Err(Error::NoParse { .. })));

        // escapes survive the trip through the printer
        let input = r#""say \"hi\"" + "back\\slash""#;
        assert_eq!(input, lang.show(&lang.parse(input)?));
        assert!(matches!(lang.parse(r#""a\qb""#), Err(Error::NoParse { .. })));
        Ok(())
    }

    #[test]
    fn round_trip() -> Result<()> {
        let l = lang();
        let one = || l.top();
        let terms = vec![
            l.times(l.plus(one(), one()), l.pow(one(), l.pow(one(), one()))),
            l.pow(l.times(l.plus(one(), one()), one()), l.plus(one(), one())),
            l.forall("x", |x| l.forall("y", |y| l.exists("z", |z| l.times(l.eq(x.clone(), z.clone()), l.eq(z, y))))),
            l.lam("f", |f| l.app(l.lam("x", |x| l.app(f.clone(), l.app(x.clone(), x))), l.lam("x", |x| l.app(f.clone(), l.app(x.clone(), x))))),
            l.app(l.lam("x", |x| l.lam("y", |y| l.app(y, x))), l.lam("x", |x| x)),
        ];
        for term in terms {
            let shown = l.show(&term.simplify_names());
            let parsed = l.parse(&shown)?;
            assert!(parsed.equals(&term), "{shown}");
            assert_eq!(strip_whitespace(&shown), strip_whitespace(&l.show(&parsed)));
        }
        Ok(())
    }

    #[test]
    fn shadowed_names_read_back() -> Result<()> {
        let l = lang();
        // a binder that must stay distinct from an enclosing one
        let term = l.lam("y", |y| l.lam("y", |y0| l.app(y, y0)));
        let renamed = l.parse(r"\y.\y@0.y y@0")?;
        assert!(renamed.equals(&term));
        let shadowing = l.parse(r"\y.\y.y")?;
        assert!(shadowing.equals(&l.lam("y", |_| l.lam("y", |y| y))));
        assert!(!shadowing.equals(&l.lam("y", |y| l.lam("y", |_| y))));
        Ok(())
    }
}
