//! Reading and writing relations as CSV.

pub mod dialect;
pub mod infer;
pub mod options;
pub mod reader;
pub mod writer;

pub use dialect::DialectOptions;
pub use options::{ColumnSpec, CsvReadOptions, CsvWriteOptions};
pub use reader::{CsvReadOutput, ParseProblem, read_csv, read_csv_path};
pub use writer::write_csv;
