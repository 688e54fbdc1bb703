use std::path::PathBuf;

use relframe_core::arrays::array::Array;
use relframe_core::arrays::datatype::DataType;
use relframe_core::ops::aggregate::AggregateExpr;
use relframe_core::ops::join::JoinType;
use relframe_core::ops::sort::SortKey;
use relframe_csv::{
    ColumnSpec,
    CsvReadOptions,
    CsvWriteOptions,
    DialectOptions,
    read_csv,
    read_csv_path,
    write_csv,
};

fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

#[test]
fn read_flights() {
    logutil::init_test();

    let out = read_csv_path(testdata("flights.csv"), &CsvReadOptions::default()).unwrap();
    assert!(out.problems.is_empty());

    let flights = out.relation;
    assert_eq!(12, flights.num_rows());
    assert_eq!(11, flights.num_columns());

    let dep_delay = flights.column("dep_delay").unwrap();
    assert_eq!(&DataType::Int64, dep_delay.datatype());
    assert_eq!(1, dep_delay.null_count());
    assert_eq!(
        &DataType::timestamp_utc(),
        flights.column("time_hour").unwrap().datatype()
    );
}

#[test]
fn flights_pipeline() {
    logutil::init_test();

    let flights = read_csv_path(testdata("flights.csv"), &CsvReadOptions::default())
        .unwrap()
        .relation;
    let airlines = read_csv_path(testdata("airlines.csv"), &CsvReadOptions::default())
        .unwrap()
        .relation;

    let out = flights
        .group_aggregate(
            &["carrier"],
            &[AggregateExpr::count(), AggregateExpr::mean("dep_delay").skip_missing()],
        )
        .unwrap()
        .join(&airlines, &["carrier".into()], JoinType::Left)
        .unwrap()
        .arrange_sort(&[SortKey::desc("n"), SortKey::asc("carrier")])
        .unwrap();

    assert_eq!(
        vec!["carrier", "n", "mean_dep_delay", "name"],
        out.column_names().collect::<Vec<_>>()
    );
    assert_eq!(
        &Array::from_iter(["AA", "B6", "UA", "DL", "EV", "OO"]),
        out.column("carrier").unwrap()
    );
    assert_eq!(&Array::from_iter([3_i64, 3, 3, 1, 1, 1]), out.column("n").unwrap());
    // EV has no delays recorded, OO is not in the airlines table.
    assert_eq!(
        &Array::from_iter([Some(1.0 / 3.0), Some(-3.0), Some(2.0 / 3.0), Some(-6.0), None, Some(30.0)]),
        out.column("mean_dep_delay").unwrap()
    );
    assert!(!out.column("name").unwrap().is_valid(5));
}

#[test]
fn read_pipe_delimited_with_problems() {
    let out = read_csv_path(testdata("planes.psv"), &CsvReadOptions::default()).unwrap();
    let planes = out.relation;

    assert_eq!(3, planes.num_rows());
    assert_eq!(
        &Array::from_iter(["Fixed wing multi engine"; 3]),
        planes.column("type").unwrap()
    );
    // Inferred as text since one value isn't a number.
    assert_eq!(&DataType::Utf8, planes.column("year").unwrap().datatype());
    assert!(out.problems.is_empty());

    let options = CsvReadOptions::default().with_column("year", ColumnSpec::Int64);
    let out = read_csv_path(testdata("planes.psv"), &options).unwrap();
    assert_eq!(1, out.problems.len());
    assert_eq!(2, out.problems[0].row);
    assert_eq!("unknown", out.problems[0].actual);
}

#[test]
fn file_round_trip() {
    let flights = read_csv_path(testdata("flights.csv"), &CsvReadOptions::default())
        .unwrap()
        .relation;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flights.tsv");
    let options = CsvWriteOptions {
        dialect: DialectOptions {
            delimiter: b'\t',
            quote: b'"',
        },
        ..Default::default()
    };
    write_csv(&flights, std::fs::File::create(&path).unwrap(), &options).unwrap();

    let read_back = read_csv(std::fs::File::open(&path).unwrap(), &CsvReadOptions::default())
        .unwrap()
        .relation;
    assert_eq!(flights, read_back);
}

#[test]
fn missing_file() {
    read_csv_path(testdata("does_not_exist.csv"), &CsvReadOptions::default()).unwrap_err();
}
