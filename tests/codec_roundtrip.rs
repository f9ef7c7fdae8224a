//! Round-trip properties of the table codec through the public API.

use dataloom::{decode, encode, AppError, Cell, Column, ColumnKind, Table};

fn cycle(table: &Table) -> Table {
    decode(&encode(table).unwrap()).unwrap()
}

fn awkward_table() -> Table {
    Table::new(vec![
        Column::integers("big", vec![Some(i64::MAX), Some(i64::MIN), None, Some(0)]),
        Column::new(
            "mixed",
            ColumnKind::Float,
            vec![
                Cell::Integer(7),
                Cell::Float(0.1 + 0.2),
                Cell::Float(-0.0),
                Cell::Float(1e-310),
            ],
        )
        .unwrap(),
        Column::texts(
            "text",
            vec![Some("line\nbreak"), Some("quote \" and , comma"), Some(""), Some("👩‍🔬 naïve")],
        ),
        Column::booleans("flag", vec![None, Some(true), Some(false), None]),
    ])
    .unwrap()
}

#[test]
fn awkward_values_survive() {
    let table = awkward_table();
    assert_eq!(cycle(&table), table);
}

#[test]
fn repeated_cycles_do_not_drift() {
    let once = cycle(&awkward_table());
    let thrice = cycle(&cycle(&once));
    assert_eq!(once, thrice);
    assert_eq!(encode(&once).unwrap(), encode(&thrice).unwrap());
}

#[test]
fn declared_kinds_are_kept() {
    let decoded = cycle(&awkward_table());
    let kinds: Vec<ColumnKind> = decoded.columns().iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![ColumnKind::Integer, ColumnKind::Float, ColumnKind::Text, ColumnKind::Boolean]
    );
    assert_eq!(decoded.column("mixed").unwrap().values[0], Cell::Float(7.0));
}

#[test]
fn empty_table_round_trips() {
    assert_eq!(cycle(&Table::empty()), Table::empty());
}

#[test]
fn all_null_column_round_trips() {
    let table = Table::new(vec![Column::floats("gone", vec![None, None, None])]).unwrap();
    let decoded = cycle(&table);
    assert_eq!(decoded.row_count(), 3);
    assert_eq!(decoded.missing_count(), 3);
}

#[test]
fn flipped_payload_byte_is_decode_error() {
    let payload = encode(&awkward_table()).unwrap();
    let mut bytes = payload.into_bytes();
    let middle = bytes.len() / 2;
    bytes[middle] = if bytes[middle] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes).unwrap();

    assert!(matches!(decode(&tampered), Err(AppError::DecodeError(_))));
}

#[test]
fn empty_payload_is_decode_error() {
    assert!(matches!(decode(""), Err(AppError::DecodeError(_))));
}
