use std::sync::Arc;

use derive_more::Display;
use indexmap::{IndexMap, IndexSet};
use log::debug;

/// A cursor position: `Kind` names the point left of a kind's rendering,
/// `Kind.field` the point right after that field.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Display)]
#[display(fmt = "{}", _0)]
pub struct Cursor(Arc<str>);

impl Cursor {
    pub fn entry(kind: &str) -> Self {
        Cursor(kind.into())
    }

    pub fn exit(kind: &str, field: &str) -> Self {
        Cursor(format!("{kind}.{field}").into())
    }

    pub fn bottom() -> Self {
        Cursor("bot".into())
    }

    pub fn top() -> Self {
        Cursor("top".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Irrevocable partial order on cursor positions.
///
/// Edges are stored as declared (`lo -> hi`); `le` searches them, treating
/// every declared bottom as below and every declared top as above all tokens.
#[derive(Debug, Clone)]
pub struct Poset {
    above: IndexMap<Cursor, IndexSet<Cursor>>,
    bottoms: IndexSet<Cursor>,
    tops: IndexSet<Cursor>,
}

impl Default for Poset {
    fn default() -> Self {
        let mut poset = Poset {
            above: IndexMap::new(),
            bottoms: IndexSet::new(),
            tops: IndexSet::new(),
        };
        poset.add_bottom(Cursor::bottom());
        poset.add_top(Cursor::top());
        poset
    }
}

impl Poset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: Cursor) {
        self.above.entry(token).or_default();
    }

    pub fn add_bottom(&mut self, token: Cursor) {
        debug!("{token} is bottom");
        self.insert(token.clone());
        self.bottoms.insert(token);
    }

    pub fn add_top(&mut self, token: Cursor) {
        debug!("{token} is top");
        self.insert(token.clone());
        self.tops.insert(token);
    }

    /// Records `lo <= hi`.
    pub fn add(&mut self, lo: Cursor, hi: Cursor) {
        debug!("{lo} <= {hi}");
        self.insert(hi.clone());
        self.above.entry(lo).or_default().insert(hi);
    }

    pub fn le(&self, lo: &Cursor, hi: &Cursor) -> bool {
        if lo == hi || self.tops.contains(hi) {
            return true;
        }
        let mut seen = IndexSet::new();
        let mut stack = vec![lo];
        while let Some(token) = stack.pop() {
            if token == hi || self.bottoms.contains(token) {
                return true;
            }
            if !seen.insert(token) {
                continue;
            }
            if let Some(next) = self.above.get(token) {
                stack.extend(next.iter());
            }
            // anything below a top reaches what the top is declared below
            if !self.tops.contains(token) {
                stack.extend(self.tops.iter());
            }
        }
        false
    }
}
