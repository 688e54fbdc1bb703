use std::collections::HashMap;

use chrono::FixedOffset;
use relframe_core::arrays::categorical::LabelSet;
use relframe_core::arrays::datatype::TimestampTypeMeta;

use crate::dialect::DialectOptions;

/// Number of records used for type inference when not specified.
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

/// Declared type of a column, overriding inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSpec {
    Boolean,
    Int64,
    Float64,
    Utf8,
    Categorical {
        labels: LabelSet,
        /// Append unseen values to the label set instead of erroring.
        allow_new: bool,
    },
    Timestamp {
        /// Explicit chrono format. Tries the default formats when None.
        format: Option<String>,
        /// Offset used for values without one.
        offset: FixedOffset,
    },
}

impl ColumnSpec {
    /// A categorical whose labels are the distinct values in first appearance
    /// order.
    pub fn categorical() -> Self {
        ColumnSpec::Categorical {
            labels: LabelSet::FirstAppearance,
            allow_new: true,
        }
    }

    pub fn timestamp_utc() -> Self {
        ColumnSpec::Timestamp {
            format: None,
            offset: TimestampTypeMeta::utc().offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvReadOptions {
    /// Dialect to use. Inferred from the start of the input when None.
    pub dialect: Option<DialectOptions>,
    /// Whether the first record holds column names.
    pub has_header: bool,
    /// Cell values read as missing.
    pub missing_values: Vec<String>,
    /// Declared column types by name. Other columns are inferred.
    pub columns: HashMap<String, ColumnSpec>,
    /// Number of records to sample when inferring types.
    pub sample_size: usize,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        CsvReadOptions {
            dialect: None,
            has_header: true,
            missing_values: vec![String::new(), "NA".to_string()],
            columns: HashMap::new(),
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl CsvReadOptions {
    pub fn with_dialect(mut self, dialect: DialectOptions) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_missing_values<S: Into<String>>(
        mut self,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.missing_values = values.into_iter().map(|v| v.into()).collect();
        self
    }

    pub fn with_column(mut self, name: impl Into<String>, spec: ColumnSpec) -> Self {
        self.columns.insert(name.into(), spec);
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub(crate) fn is_missing(&self, value: &str) -> bool {
        self.missing_values.iter().any(|m| m == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvWriteOptions {
    pub dialect: DialectOptions,
    pub write_header: bool,
    /// Token written for missing values.
    pub missing: String,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        CsvWriteOptions {
            dialect: DialectOptions::default(),
            write_header: true,
            missing: "NA".to_string(),
        }
    }
}
