//! Reading CSV into a relation.
//!
//! The whole input is decoded into string records first. Column types come
//! from the declared `ColumnSpec`s, or are inferred from a sample of records.
//! Cells that fail to parse into the column type become missing and are
//! reported as `ParseProblem`s alongside the relation.

use std::fmt;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use relframe_core::arrays::array::{Array, ArrayBuilder};
use relframe_core::arrays::categorical::encode_categorical;
use relframe_core::arrays::compute::cast::parse::{
    BoolParser,
    Float64Parser,
    Int64Parser,
    Parser,
    TimestampParser,
};
use relframe_core::arrays::datatype::{DataType, TimestampTypeMeta};
use relframe_core::arrays::scalar::{ScalarValue, TimestampScalar};
use relframe_core::relation::Relation;
use relframe_error::{RelError, Result, ResultExt};
use tracing::{debug, warn};

use crate::dialect::DialectOptions;
use crate::infer::infer_column_type;
use crate::options::{ColumnSpec, CsvReadOptions};

/// Bytes from the start of the input used to infer the dialect.
const DIALECT_SAMPLE_BYTES: usize = 16 * 1024;

/// A cell that could not be parsed into its column's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProblem {
    /// Zero-based data row, not counting the header.
    pub row: usize,
    pub column: String,
    /// Expected column type.
    pub expected: String,
    /// The text that failed to parse.
    pub actual: String,
}

impl fmt::Display for ParseProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}, column '{}': expected {}, got '{}'",
            self.row, self.column, self.expected, self.actual
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvReadOutput {
    pub relation: Relation,
    pub problems: Vec<ParseProblem>,
}

/// Read a CSV file from disk.
pub fn read_csv_path(path: impl AsRef<Path>, options: &CsvReadOptions) -> Result<CsvReadOutput> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .context_fn(|| format!("Failed to open '{}'", path.display()))?;
    read_csv(file, options)
}

/// Read CSV from any reader.
pub fn read_csv<R: Read>(mut reader: R, options: &CsvReadOptions) -> Result<CsvReadOutput> {
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .context("Failed to read CSV input")?;

    let dialect = match options.dialect {
        Some(dialect) => dialect,
        None => {
            let sample = &buf[..buf.len().min(DIALECT_SAMPLE_BYTES)];
            let inferred = DialectOptions::infer_from_sample(sample);
            debug!(?inferred, "inferred csv dialect");
            inferred.unwrap_or_default()
        }
    };

    let mut records = Vec::new();
    for (idx, record) in dialect
        .csv_reader_builder()
        .from_reader(buf.as_slice())
        .records()
        .enumerate()
    {
        let record = record.map_err(|e| {
            RelError::parse("Failed to decode CSV record").with_field("record", idx).with_field("error", e)
        })?;
        records.push(record);
    }

    let (names, data) = split_header(records, options.has_header);
    check_field_counts(&data, names.len(), options.has_header)?;

    let mut problems = Vec::new();
    let mut columns = Vec::with_capacity(names.len());
    for (col_idx, name) in names.iter().enumerate() {
        let cells: Vec<&str> = data.iter().map(|rec| rec.get(col_idx).unwrap_or("")).collect();
        let spec = match options.columns.get(name) {
            Some(spec) => spec.clone(),
            None => {
                let sample = cells.iter().take(options.sample_size).copied();
                spec_for_type(infer_column_type(sample, |v| options.is_missing(v)))
            }
        };
        let array = build_column(name, &cells, &spec, options, &mut problems)?;
        columns.push((name.clone(), array));
    }

    if !problems.is_empty() {
        warn!(
            num_problems = problems.len(),
            first = %problems[0],
            "some csv values failed to parse and were read as missing"
        );
    }

    let relation = if columns.is_empty() {
        Relation::new_without_columns(data.len())
    } else {
        Relation::try_new(columns)?
    };
    debug!(
        num_rows = relation.num_rows(),
        num_columns = relation.num_columns(),
        "read csv"
    );

    Ok(CsvReadOutput { relation, problems })
}

/// Split off the header, generating `X1..Xn` names when there isn't one.
fn split_header(mut records: Vec<StringRecord>, has_header: bool) -> (Vec<String>, Vec<StringRecord>) {
    if has_header && !records.is_empty() {
        let header = records.remove(0);
        let names = header.iter().map(|s| s.trim().to_string()).collect();
        (names, records)
    } else {
        let width = records.first().map(|r| r.len()).unwrap_or(0);
        let names = (1..=width).map(|idx| format!("X{idx}")).collect();
        (names, records)
    }
}

fn check_field_counts(data: &[StringRecord], expected: usize, has_header: bool) -> Result<()> {
    for (idx, record) in data.iter().enumerate() {
        if record.len() != expected {
            // One-based line number for humans.
            let line = idx + 1 + usize::from(has_header);
            return Err(RelError::parse("Record has the wrong number of fields")
                .with_field("line", line)
                .with_field("expected", expected)
                .with_field("got", record.len()));
        }
    }
    Ok(())
}

fn spec_for_type(datatype: DataType) -> ColumnSpec {
    match datatype {
        DataType::Boolean => ColumnSpec::Boolean,
        DataType::Int64 => ColumnSpec::Int64,
        DataType::Float64 => ColumnSpec::Float64,
        DataType::Timestamp(meta) => ColumnSpec::Timestamp {
            format: None,
            offset: meta.offset,
        },
        DataType::Utf8 | DataType::Categorical(_) => ColumnSpec::Utf8,
    }
}

fn build_column(
    name: &str,
    cells: &[&str],
    spec: &ColumnSpec,
    options: &CsvReadOptions,
    problems: &mut Vec<ParseProblem>,
) -> Result<Array> {
    match spec {
        ColumnSpec::Boolean => parse_column(
            name,
            cells,
            &DataType::Boolean,
            options,
            problems,
            |v| BoolParser.parse(v).map(ScalarValue::Boolean),
        ),
        ColumnSpec::Int64 => {
            let mut parser = Int64Parser::new();
            parse_column(name, cells, &DataType::Int64, options, problems, |v| {
                parser.parse(v).map(ScalarValue::Int64)
            })
        }
        ColumnSpec::Float64 => {
            let mut parser = Float64Parser::new();
            parse_column(name, cells, &DataType::Float64, options, problems, |v| {
                parser.parse(v).map(ScalarValue::Float64)
            })
        }
        ColumnSpec::Timestamp { format, offset } => {
            let mut parser = match format {
                Some(format) => TimestampParser::with_formats([format.as_str()], *offset),
                None => TimestampParser::new(*offset),
            };
            let meta = TimestampTypeMeta { offset: *offset };
            parse_column(name, cells, &DataType::Timestamp(meta), options, problems, |v| {
                parser.parse(v).map(|micros| {
                    ScalarValue::Timestamp(TimestampScalar {
                        micros,
                        offset: *offset,
                    })
                })
            })
        }
        ColumnSpec::Utf8 => parse_column(name, cells, &DataType::Utf8, options, problems, |v| {
            Some(ScalarValue::Utf8(v.to_string()))
        }),
        ColumnSpec::Categorical { labels, allow_new } => {
            let values = cells
                .iter()
                .map(|v| (!options.is_missing(v)).then_some(*v));
            encode_categorical(values, labels, *allow_new).map_err(|e| e.with_field("column", name))
        }
    }
}

/// Parse cells with `parse`, recording a problem for each cell it rejects.
fn parse_column(
    name: &str,
    cells: &[&str],
    datatype: &DataType,
    options: &CsvReadOptions,
    problems: &mut Vec<ParseProblem>,
    mut parse: impl FnMut(&str) -> Option<ScalarValue>,
) -> Result<Array> {
    let mut builder = ArrayBuilder::with_capacity(datatype, cells.len());
    for (row, cell) in cells.iter().enumerate() {
        if options.is_missing(cell) {
            builder.push_null();
            continue;
        }
        match parse(cell.trim()) {
            Some(value) => builder.push_value(&value)?,
            None => {
                problems.push(ParseProblem {
                    row,
                    column: name.to_string(),
                    expected: datatype.to_string(),
                    actual: cell.to_string(),
                });
                builder.push_null();
            }
        }
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use relframe_error::ErrorKind;

    use super::*;

    fn read(input: &str, options: &CsvReadOptions) -> CsvReadOutput {
        read_csv(input.as_bytes(), options).unwrap()
    }

    #[test]
    fn read_with_inference() {
        let input = "\
year,month,carrier,dep_delay,time_hour,cancelled
2013,1,UA,2,2013-01-01 05:00:00,FALSE
2013,1,AA,NA,2013-01-01 05:00:00,TRUE
2013,2,B6,-1.5,2013-02-01 06:00:00,
";
        let out = read(input, &CsvReadOptions::default());
        assert!(out.problems.is_empty());

        let rel = out.relation;
        assert_eq!(3, rel.num_rows());
        let types: Vec<_> = rel.schema().fields().iter().map(|f| f.datatype.clone()).collect();
        assert_eq!(
            vec![
                DataType::Int64,
                DataType::Int64,
                DataType::Utf8,
                DataType::Float64,
                DataType::timestamp_utc(),
                DataType::Boolean,
            ],
            types
        );
        assert_eq!(
            &Array::from_iter([Some(2.0), None, Some(-1.5)]),
            rel.column("dep_delay").unwrap()
        );
        assert_eq!(
            &Array::from_iter([Some(false), Some(true), None]),
            rel.column("cancelled").unwrap()
        );
    }

    #[test]
    fn declared_types_and_problems() {
        let input = "tailnum,year\nN10156,2004\nN102UW,unknown\n";
        let options = CsvReadOptions::default().with_column("year", ColumnSpec::Int64);
        let out = read(input, &options);

        assert_eq!(
            &Array::from_iter([Some(2004_i64), None]),
            out.relation.column("year").unwrap()
        );
        assert_eq!(
            vec![ParseProblem {
                row: 1,
                column: "year".to_string(),
                expected: "Int64".to_string(),
                actual: "unknown".to_string(),
            }],
            out.problems
        );
    }

    #[test]
    fn categorical_column() {
        let input = "month\nJan\nMar\nJan\n";
        let options = CsvReadOptions::default().with_column(
            "month",
            ColumnSpec::Categorical {
                labels: relframe_core::arrays::categorical::LabelSet::explicit(["Jan", "Feb", "Mar"]),
                allow_new: false,
            },
        );
        let out = read(input, &options);
        let month = out.relation.column("month").unwrap();
        assert_eq!(&DataType::categorical(["Jan", "Feb", "Mar"]).unwrap(), month.datatype());

        let input = "month\nJan\nDec\n";
        let err = read_csv(input.as_bytes(), &options).unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
    }

    #[test]
    fn explicit_timestamp_format() {
        let input = "date\n31/01/2013\n01/02/2013\n";
        let options = CsvReadOptions::default().with_column(
            "date",
            ColumnSpec::Timestamp {
                format: Some("%d/%m/%Y".to_string()),
                offset: TimestampTypeMeta::utc().offset,
            },
        );
        let out = read(input, &options);
        let dates: Vec<_> = out
            .relation
            .column("date")
            .unwrap()
            .iter_scalars()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(vec!["2013-01-31 00:00:00", "2013-02-01 00:00:00"], dates);
    }

    #[test]
    fn no_header() {
        let input = "1;a\n2;b\n";
        let options = CsvReadOptions::default().with_header(false);
        let out = read(input, &options);
        assert_eq!(vec!["X1", "X2"], out.relation.column_names().collect::<Vec<_>>());
        assert_eq!(2, out.relation.num_rows());
    }

    #[test]
    fn wrong_field_count() {
        let input = "a,b\n1,2\n3\n";
        let err = read_csv(input.as_bytes(), &CsvReadOptions::default()).unwrap_err();
        assert_eq!(ErrorKind::Parse, err.kind());
        assert_eq!(Some("3"), err.get_field("line"));
    }

    #[test]
    fn duplicate_header_names() {
        let input = "a,a\n1,2\n";
        let err = read_csv(input.as_bytes(), &CsvReadOptions::default()).unwrap_err();
        assert_eq!(ErrorKind::InvalidArgument, err.kind());
    }

    #[test]
    fn custom_missing_values() {
        let input = "x\n1\n-\n";
        let options = CsvReadOptions::default().with_missing_values(["-"]);
        let out = read(input, &options);
        assert_eq!(
            &Array::from_iter([Some(1_i64), None]),
            out.relation.column("x").unwrap()
        );
    }

    #[test]
    fn header_only() {
        let out = read("a,b\n", &CsvReadOptions::default());
        assert_eq!(0, out.relation.num_rows());
        assert_eq!(2, out.relation.num_columns());
    }
}
