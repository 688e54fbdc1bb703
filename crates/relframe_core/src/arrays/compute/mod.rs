pub mod cast;
pub mod cmp;
pub mod filter;
pub mod interleave;
