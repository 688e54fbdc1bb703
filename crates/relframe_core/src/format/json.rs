//! JSON output of relation rows.

use std::io::Write;

use relframe_error::{RelError, Result};
use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};

use crate::relation::Relation;

/// How records are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonLayout {
    /// A single array of objects.
    #[default]
    Array,
    /// One object per line.
    Lines,
}

/// Serializes one row as an object keyed by column name.
struct RecordRef<'a> {
    relation: &'a Relation,
    row: usize,
}

impl Serialize for RecordRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.relation.num_columns()))?;
        for (field, column) in self.relation.iter_columns() {
            let value = column
                .logical_value(self.row)
                .map_err(serde::ser::Error::custom)?;
            map.serialize_entry(&field.name, &value)?;
        }
        map.end()
    }
}

struct RecordsRef<'a>(&'a Relation);

impl Serialize for RecordsRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.num_rows()))?;
        for row in 0..self.0.num_rows() {
            seq.serialize_element(&RecordRef {
                relation: self.0,
                row,
            })?;
        }
        seq.end()
    }
}

fn json_err(e: serde_json::Error) -> RelError {
    RelError::with_source("Failed to write JSON", Box::new(e))
}

/// Write rows as JSON objects. Missing values are written as `null` and
/// timestamps as RFC 3339 strings.
pub fn write_records<W: Write>(
    relation: &Relation,
    mut writer: W,
    layout: JsonLayout,
) -> Result<()> {
    match layout {
        JsonLayout::Array => {
            serde_json::to_writer(&mut writer, &RecordsRef(relation)).map_err(json_err)?;
            writeln!(writer)?;
        }
        JsonLayout::Lines => {
            for row in 0..relation.num_rows() {
                serde_json::to_writer(&mut writer, &RecordRef { relation, row })
                    .map_err(json_err)?;
                writeln!(writer)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Render rows as a JSON array string.
pub fn to_json_string(relation: &Relation) -> Result<String> {
    serde_json::to_string(&RecordsRef(relation)).map_err(json_err)
}
