pub mod abt;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod mocks;
pub mod name;
pub mod parse;
pub mod poset;
pub mod pretty;
pub mod syntax;

pub use abt::{Binder, Literal, Node, Slot, Term};
pub use error::{Error, Result};
pub use name::Name;
pub use poset::{Cursor, Poset};
pub use pretty::{Mode, Spelling};
pub use syntax::{Decl, Field, Kind, Language, Shape};
