//! Relational operators.
//!
//! Every operator takes relations by reference and returns a new relation.
//! Each is also available as a method on `Relation`.

pub mod aggregate;
pub mod count;
pub mod distinct;
pub mod filter;
pub mod join;
pub mod misc;
pub mod mutate;
pub mod select;
pub mod sort;

pub(crate) mod group_key;
