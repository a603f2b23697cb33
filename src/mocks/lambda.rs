//! One step of leftmost-outermost beta reduction, also under lambdas.

use crate::abt::{Binder, Slot, Term};

use super::{node, Mock};

pub fn step(l: &Mock, term: &Term) -> Option<Term> {
    let k = &l.kinds;
    if let Some([Slot::Term(m), Slot::Term(n)]) = term.view(&k.app) {
        if let Some([Slot::Binder(b)]) = m.view(&k.lam) {
            let (x, body) = b.open();
            let substitution = [(x, n.clone())].into_iter().collect();
            return Some(body.subst(&substitution));
        }
        if let Some(m) = step(l, m) {
            return Some(l.app(m, n.clone()));
        }
        return step(l, n).map(|n| l.app(m.clone(), n));
    }
    if let Some([Slot::Binder(b)]) = term.view(&k.lam) {
        let (x, body) = b.open();
        return step(l, &body).map(|body| node(&k.lam, vec![Binder::new(x, body).into()]));
    }
    None
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::mocks::{lang, PRETTY};

    #[test]
    fn substitution_does_not_capture() {
        let l = lang();
        let t = l.lam("y", |y| l.app(l.lam("x", |x| l.lam("y", |_| x)), y));
        assert_snapshot!(l.render(&t.simplify_names(), PRETTY), @"λy. (λx. λy@0. x) y");
        let s = step(l, &t).unwrap();
        assert_snapshot!(l.render(&s.simplify_names(), PRETTY), @"λy. λy@0. y");
        assert!(step(l, &s).is_none());
    }

    #[test]
    fn omega_steps_to_itself() {
        let l = lang();
        let omega = || l.lam("x", |x| l.app(x.clone(), x));
        let t = l.app(omega(), omega());
        assert!(step(l, &t).unwrap().equals(&t));
    }

    #[test]
    fn identity() {
        let l = lang();
        let id = || l.lam("x", |x| x);
        let s = step(l, &l.app(id(), id())).unwrap();
        assert_snapshot!(l.render(&s.simplify_names(), PRETTY), @"λx. x");
        // leftmost first
        let t = l.app(l.app(id(), id()), l.app(id(), id()));
        let s = step(l, &t).unwrap();
        assert_snapshot!(l.show(&s.simplify_names()), @r"(\x.x) ((\x.x) (\x.x))");
    }
}
