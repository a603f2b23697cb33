use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use derive_new::new;

static NEXT_DISAMBIGUATOR: AtomicUsize = AtomicUsize::new(0);

/// Next value of the process-wide disambiguator counter. Values are never
/// handed out twice.
///
/// # Panics
///
/// Once all `usize` values are used up, rather than wrap around.
pub fn fresh_counter() -> usize {
    advance(&NEXT_DISAMBIGUATOR)
}

fn advance(counter: &AtomicUsize) -> usize {
    match counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1)) {
        Ok(n) => n,
        Err(_) => panic!("disambiguator counter exhausted"),
    }
}

/// A variable name: a display tag plus an optional disambiguator.
///
/// Two names are the same name iff both parts match, so `x@3` and `x@4` are
/// unrelated variables that merely print alike before `simplify_names`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, new)]
pub struct Name {
    tag: Arc<str>,
    disambiguator: Option<usize>,
}

impl Name {
    /// A name as written by a user, e.g. an identifier read by the parser.
    pub fn plain(tag: &str) -> Self {
        Name::new(tag.into(), None)
    }

    pub fn fresh(tag: &str) -> Self {
        Name::new(tag.into(), Some(fresh_counter()))
    }

    /// Same tag, new disambiguator.
    pub fn refresh(&self) -> Self {
        Name::new(self.tag.clone(), Some(fresh_counter()))
    }

    pub fn with_disambiguator(&self, disambiguator: Option<usize>) -> Self {
        Name::new(self.tag.clone(), disambiguator)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn disambiguator(&self) -> Option<usize> {
        self.disambiguator
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.disambiguator {
            None => write!(f, "{}", self.tag),
            Some(n) => write!(f, "{}@{}", self.tag, n),
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({}, {:?})", self.tag, self.disambiguator)
    }
}
