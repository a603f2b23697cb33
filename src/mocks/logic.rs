//! A formula simplifier: `m = m` becomes `1`, `1` is a unit for `*`, and
//! quantifiers whose variable does not occur are dropped.

use crate::abt::{Binder, Slot, Term};

use super::{node, Mock};

pub fn simplify(l: &Mock, term: &Term) -> Term {
    let current = match term.as_node() {
        Some(n) => n,
        None => return term.clone(),
    };
    let slots = current
        .slots()
        .iter()
        .map(|slot| match slot {
            Slot::Term(t) => Slot::Term(simplify(l, t)),
            Slot::Binder(b) => {
                let (x, body) = b.open();
                Slot::Binder(Binder::new(x, simplify(l, &body)))
            }
        })
        .collect::<Vec<_>>();
    let term = node(current.kind(), slots);

    let is_top = |t: &Term| t.view(&l.kinds.top).is_some();
    let k = &l.kinds;
    if let Some([m, n]) = term.view(&k.eq) {
        if let (Some(m), Some(n)) = (m.term(), n.term()) {
            if m.equals(n) {
                return l.top();
            }
        }
    }
    if let Some([p, q]) = term.view(&k.times) {
        if let (Some(p), Some(q)) = (p.term(), q.term()) {
            if is_top(p) {
                return q.clone();
            }
            if is_top(q) {
                return p.clone();
            }
        }
    }
    for quantifier in [&k.forall, &k.exists] {
        if let Some([Slot::Binder(b)]) = term.view(quantifier) {
            let (x, body) = b.open();
            if !body.free_names().contains(&x) {
                return body;
            }
        }
    }
    term
}
