pub mod array;
pub mod bitmap;
pub mod categorical;
pub mod compute;
pub mod datatype;
pub mod field;
pub mod scalar;
pub mod selection;
