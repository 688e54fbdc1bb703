//! Pretty tables for terminals.

use comfy_table::{Cell, ContentArrangement, Table};

use super::{FormatOptions, Formatter};
use crate::arrays::field::Field;
use crate::relation::Relation;

const DEFAULT_PRESET: &str = "││──╞═╪╡│    ┬┴┌┐└┘";
const STR_TRUNCATE: usize = 32;

fn default_table() -> Table {
    let mut table = Table::new();
    table.load_preset(DEFAULT_PRESET);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn truncate_str(v: &str, truncate: usize) -> String {
    match v.char_indices().nth(truncate) {
        Some((idx, _)) => format!("{}…", &v[..idx]),
        None => v.to_string(),
    }
}

fn field_header(field: &Field) -> String {
    format!(
        "{}\n──\n{}",
        truncate_str(&field.name, STR_TRUNCATE),
        field.datatype
    )
}

/// Render a relation as a table with column types in the header.
///
/// Relations longer than `max_rows` show the first and last rows with a
/// continuation row in between, followed by a row count footer.
pub fn pretty_format(relation: &Relation, options: &FormatOptions) -> String {
    let mut table = default_table();
    let num_columns = relation.num_columns();
    if num_columns == 0 {
        return format!("({} rows, no columns)", relation.num_rows());
    }

    table.set_header(
        relation
            .schema()
            .fields()
            .iter()
            .map(field_header)
            .collect::<Vec<_>>(),
    );

    let total_rows = relation.num_rows();
    let max_rows = options.max_rows.max(1);
    let (head, tail) = if total_rows > max_rows {
        (max_rows.div_ceil(2), max_rows / 2)
    } else {
        (total_rows, 0)
    };

    let formatter = Formatter::new(options.clone());
    let add_rows = |table: &mut Table, rows: std::ops::Range<usize>| {
        for row in rows {
            let cells: Vec<Cell> = relation
                .columns()
                .iter()
                .map(|col| match formatter.format_array_value(col, row) {
                    Ok(v) => Cell::new(truncate_str(&v.to_string(), STR_TRUNCATE)),
                    Err(_) => Cell::new(""),
                })
                .collect();
            table.add_row(cells);
        }
    };

    add_rows(&mut table, 0..head);
    if tail > 0 {
        table.add_row((0..num_columns).map(|_| Cell::new("…")).collect::<Vec<_>>());
        add_rows(&mut table, (total_rows - tail)..total_rows);
    }

    if head + tail < total_rows {
        table.add_row((0..num_columns).map(|_| Cell::new("───")).collect::<Vec<_>>());
        let mut footer = vec![Cell::new(format!(
            "{total_rows} rows ({} shown)",
            head + tail
        ))];
        footer.extend((1..num_columns).map(|_| Cell::new("")));
        table.add_row(footer);
    }

    table.to_string()
}
