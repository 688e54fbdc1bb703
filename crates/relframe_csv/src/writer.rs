use std::io::Write;

use csv::ByteRecord;
use relframe_core::arrays::array::Array;
use relframe_core::arrays::scalar::ScalarValue;
use relframe_core::format::{FormatOptions, Formatter};
use relframe_core::relation::Relation;
use relframe_error::{Result, ResultExt};
use tracing::debug;

use crate::options::CsvWriteOptions;

/// Encodes relations as CSV records.
#[derive(Debug)]
pub struct CsvEncoder<'a> {
    options: &'a CsvWriteOptions,
    /// Buffer used for formatting a single value.
    format_buf: Vec<u8>,
    /// Buffer for the current record.
    record: ByteRecord,
}

impl<'a> CsvEncoder<'a> {
    pub fn new(options: &'a CsvWriteOptions) -> Self {
        CsvEncoder {
            options,
            format_buf: Vec::with_capacity(64),
            record: ByteRecord::new(),
        }
    }

    pub fn encode<W: Write>(&mut self, relation: &Relation, writer: W) -> Result<()> {
        let options = self.options;
        let formatter = Formatter::new(FormatOptions {
            null: &options.missing,
            ..FormatOptions::new()
        });

        let mut csv_writer = options.dialect.csv_writer_builder().from_writer(writer);

        if options.write_header {
            self.record.clear();
            for name in relation.column_names() {
                self.record.push_field(name.as_bytes());
            }
            csv_writer
                .write_record(&self.record)
                .context("Failed to write header")?;
        }

        for row in 0..relation.num_rows() {
            self.record.clear();
            for col in relation.columns() {
                self.format_buf.clear();
                write_value(&formatter, col, row, &mut self.format_buf)?;
                self.record.push_field(&self.format_buf);
            }
            csv_writer
                .write_record(&self.record)
                .context("Failed to write record")?;
        }

        csv_writer.flush().context("Failed to flush")?;
        debug!(num_rows = relation.num_rows(), "wrote csv");

        Ok(())
    }
}

/// Timestamps are written as RFC 3339 so they keep their offset.
fn write_value(formatter: &Formatter, col: &Array, row: usize, buf: &mut Vec<u8>) -> Result<()> {
    match col.logical_value(row)? {
        ScalarValue::Timestamp(ts) => write!(buf, "{}", ts.to_rfc3339()),
        other => write!(buf, "{}", formatter.format_scalar_value(other)),
    }
    .context("Failed to format value")
}

/// Write a relation as CSV.
pub fn write_csv<W: Write>(relation: &Relation, writer: W, options: &CsvWriteOptions) -> Result<()> {
    CsvEncoder::new(options).encode(relation, writer)
}

#[cfg(test)]
mod tests {
    use relframe_core::arrays::datatype::TimestampTypeMeta;

    use super::*;
    use crate::dialect::DialectOptions;
    use crate::options::CsvReadOptions;
    use crate::reader::read_csv;

    fn flights() -> Relation {
        Relation::try_new([
            ("carrier", Array::from_iter([Some("UA"), None, Some("a,b")])),
            ("dep_delay", Array::from_iter([Some(2.5), Some(-1.0), None])),
            ("cancelled", Array::from_iter([Some(false), Some(true), None])),
        ])
        .unwrap()
    }

    fn write_to_string(relation: &Relation, options: &CsvWriteOptions) -> String {
        let mut buf = Vec::new();
        write_csv(relation, &mut buf, options).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn write_basic() {
        let out = write_to_string(&flights(), &CsvWriteOptions::default());
        let expected = "\
carrier,dep_delay,cancelled
UA,2.5,FALSE
NA,-1,TRUE
\"a,b\",NA,NA
";
        assert_eq!(expected, out);
    }

    #[test]
    fn write_custom_dialect_no_header() {
        let options = CsvWriteOptions {
            dialect: DialectOptions {
                delimiter: b'|',
                quote: b'"',
            },
            write_header: false,
            missing: String::new(),
        };
        let out = write_to_string(&flights(), &options);
        assert_eq!("UA|2.5|FALSE\n|-1|TRUE\na,b||\n", out);
    }

    #[test]
    fn timestamps_as_rfc3339() {
        let ts = Array::from_timestamps(TimestampTypeMeta::utc(), [Some(1_357_016_400_000_000)]);
        let rel = Relation::try_new([("time_hour", ts)]).unwrap();
        let out = write_to_string(&rel, &CsvWriteOptions::default());
        assert_eq!("time_hour\n2013-01-01T05:00:00Z\n", out);
    }

    #[test]
    fn write_then_read() {
        let rel = flights();
        let out = write_to_string(&rel, &CsvWriteOptions::default());
        let read = read_csv(out.as_bytes(), &CsvReadOptions::default()).unwrap();
        assert!(read.problems.is_empty());
        assert_eq!(rel, read.relation);
    }
}
