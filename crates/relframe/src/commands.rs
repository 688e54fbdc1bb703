use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use relframe_core::arrays::array::Array;
use relframe_core::config::session::SessionConfig;
use relframe_core::format::json::{JsonLayout, write_records};
use relframe_core::format::pretty::pretty_format;
use relframe_core::ops::aggregate::{AggregateExpr, group_aggregate};
use relframe_core::ops::distinct::DistinctOptions;
use relframe_core::ops::join::{JoinKey, join};
use relframe_core::ops::select::ColumnSelector;
use relframe_core::ops::sort::SortKey;
use relframe_core::relation::Relation;
use relframe_csv::{CsvReadOptions, CsvWriteOptions, read_csv_path, write_csv};
use relframe_error::Result;
use tracing::info;

use crate::args::{
    InputArgs,
    JoinMode,
    OutputFormat,
    parse_aggregate,
    parse_condition,
    parse_join_key,
    parse_sort_key,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Print column names, types and missing counts.
    Schema(InputArgs),
    /// Print the first rows.
    Head(HeadArgs),
    /// Keep only some columns.
    Select(SelectArgs),
    /// Keep rows matching every condition.
    Filter(FilterArgs),
    /// Count rows per group.
    Count(CountArgs),
    /// Compute aggregates per group.
    Summarize(SummarizeArgs),
    /// Sort rows.
    Sort(SortArgs),
    /// Remove duplicate rows.
    Distinct(DistinctArgs),
    /// Join with another file.
    Join(JoinArgs),
    /// List session settings usable with `--set`.
    Settings,
}

#[derive(Debug, Args)]
pub struct HeadArgs {
    #[clap(flatten)]
    input: InputArgs,
    /// Number of rows.
    #[clap(short = 'n', long, default_value_t = 10)]
    rows: usize,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    #[clap(flatten)]
    input: InputArgs,
    /// Columns to keep, in output order.
    #[clap(long, value_delimiter = ',', required = true)]
    columns: Vec<String>,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[clap(flatten)]
    input: InputArgs,
    /// Condition such as `dep_delay>=30` or `carrier=UA`. May be repeated.
    #[clap(long = "where", value_name = "CONDITION", required = true)]
    conditions: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CountArgs {
    #[clap(flatten)]
    input: InputArgs,
    /// Group columns.
    #[clap(long, value_delimiter = ',')]
    by: Vec<String>,
    /// Sort by descending count.
    #[clap(long)]
    sort: bool,
}

#[derive(Debug, Args)]
pub struct SummarizeArgs {
    #[clap(flatten)]
    input: InputArgs,
    /// Group columns.
    #[clap(long, value_delimiter = ',')]
    by: Vec<String>,
    /// Aggregate as `fn:col` or `fn:col=name`, or `n` to count rows.
    #[clap(long = "agg", value_name = "AGGREGATE", value_parser = parse_aggregate, required = true)]
    aggregates: Vec<AggregateExpr>,
    /// Ignore missing values in aggregate inputs.
    #[clap(long)]
    skip_missing: bool,
}

#[derive(Debug, Args)]
pub struct SortArgs {
    #[clap(flatten)]
    input: InputArgs,
    /// Sort keys as `col` or `col:desc`.
    #[clap(long, value_delimiter = ',', value_parser = parse_sort_key, required = true)]
    by: Vec<SortKey>,
}

#[derive(Debug, Args)]
pub struct DistinctArgs {
    #[clap(flatten)]
    input: InputArgs,
    /// Columns that determine uniqueness. Defaults to all columns.
    #[clap(long, value_delimiter = ',')]
    by: Vec<String>,
    /// Keep every column of the first row for each key.
    #[clap(long)]
    keep_all: bool,
}

#[derive(Debug, Args)]
pub struct JoinArgs {
    #[clap(flatten)]
    input: InputArgs,
    /// Right side of the join.
    #[clap(long = "with", value_name = "FILE")]
    right: PathBuf,
    /// Join keys as `key` or `left=right`.
    #[clap(long, value_delimiter = ',', value_parser = parse_join_key, required = true)]
    on: Vec<JoinKey>,
    #[clap(long, value_enum, default_value_t = JoinMode::Inner)]
    mode: JoinMode,
}

impl Commands {
    pub fn run(self, config: &SessionConfig, output: OutputFormat) -> Result<()> {
        let relation = match self {
            Commands::Schema(input) => describe_schema(&read_input(&input)?)?,
            Commands::Head(args) => read_input(&args.input)?.slice_head(args.rows)?,
            Commands::Select(args) => {
                read_input(&args.input)?.select(&ColumnSelector::names(args.columns))?
            }
            Commands::Filter(args) => {
                let relation = read_input(&args.input)?;
                let predicates = args
                    .conditions
                    .iter()
                    .map(|c| parse_condition(c)?.to_expr(relation.schema()))
                    .collect::<Result<Vec<_>>>()?;
                relation.filter(&predicates)?
            }
            Commands::Count(args) => {
                let keys: Vec<&str> = args.by.iter().map(|s| s.as_str()).collect();
                let counts = read_input(&args.input)?.count(&keys)?;
                if args.sort {
                    counts.arrange_sort(&[SortKey::desc("n")])?
                } else {
                    counts
                }
            }
            Commands::Summarize(args) => {
                let keys: Vec<&str> = args.by.iter().map(|s| s.as_str()).collect();
                let aggregates: Vec<_> = if args.skip_missing {
                    args.aggregates.into_iter().map(|a| a.skip_missing()).collect()
                } else {
                    args.aggregates
                };
                group_aggregate(
                    &read_input(&args.input)?,
                    &keys,
                    &aggregates,
                    &config.execution_config(),
                )?
            }
            Commands::Sort(args) => read_input(&args.input)?.arrange_sort(&args.by)?,
            Commands::Distinct(args) => {
                let options = if args.by.is_empty() {
                    DistinctOptions::default()
                } else {
                    DistinctOptions::on(args.by).keep_all(args.keep_all)
                };
                read_input(&args.input)?.distinct_rows(&options)?
            }
            Commands::Join(args) => {
                let left = read_input(&args.input)?;
                let right = read_path(&args.right, &args.input.read_options())?;
                join(
                    &left,
                    &right,
                    &args.on,
                    args.mode.into(),
                    &config.join_options(),
                )?
            }
            Commands::Settings => describe_settings(config)?,
        };

        write_output(&relation, config, output)
    }
}

fn read_input(input: &InputArgs) -> Result<Relation> {
    read_path(&input.file, &input.read_options())
}

fn read_path(path: &Path, options: &CsvReadOptions) -> Result<Relation> {
    let out = read_csv_path(path, options)?;
    info!(
        path = %path.display(),
        num_rows = out.relation.num_rows(),
        num_problems = out.problems.len(),
        "read input"
    );
    Ok(out.relation)
}

/// One row per column with its type and number of missing values.
fn describe_schema(relation: &Relation) -> Result<Relation> {
    let names: Array = relation.column_names().collect();
    let types: Vec<String> = relation
        .schema()
        .fields()
        .iter()
        .map(|f| f.datatype.to_string())
        .collect();
    let types: Array = types.iter().map(|s| s.as_str()).collect();
    let missing: Array = relation
        .columns()
        .iter()
        .map(|c| c.null_count() as i64)
        .collect();
    Relation::try_new([("column", names), ("type", types), ("missing", missing)])
}

fn describe_settings(config: &SessionConfig) -> Result<Relation> {
    let settings = SessionConfig::describe_settings();
    let values = settings
        .iter()
        .map(|(name, _)| config.get_as_scalar(name).map(|v| v.to_string()))
        .collect::<Result<Vec<_>>>()?;

    let names: Array = settings.iter().map(|(name, _)| *name).collect();
    let values: Array = values.iter().map(|v| v.as_str()).collect();
    let descriptions: Array = settings.iter().map(|(_, desc)| *desc).collect();
    Relation::try_new([
        ("name", names),
        ("value", values),
        ("description", descriptions),
    ])
}

fn write_output(relation: &Relation, config: &SessionConfig, output: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut writer = BufWriter::new(stdout.lock());

    match output {
        OutputFormat::Table => {
            writeln!(writer, "{}", pretty_format(relation, &config.format_options()))?;
            writer.flush()?;
        }
        OutputFormat::Json => write_records(relation, writer, JsonLayout::Array)?,
        OutputFormat::Jsonl => write_records(relation, writer, JsonLayout::Lines)?,
        OutputFormat::Csv => {
            let options = CsvWriteOptions {
                missing: config.display_null.clone(),
                ..Default::default()
            };
            write_csv(relation, writer, &options)?;
        }
    }

    Ok(())
}
