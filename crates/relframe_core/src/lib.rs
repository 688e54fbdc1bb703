//! In-memory relations and the relational operators over them.

pub mod arrays;
pub mod config;
pub mod expr;
pub mod format;
pub mod ops;
pub mod relation;
pub mod testutil;

pub use arrays::array::Array;
pub use arrays::datatype::DataType;
pub use arrays::field::{Field, Schema};
pub use arrays::scalar::ScalarValue;
pub use relation::Relation;
