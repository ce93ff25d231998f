use std::fs::OpenOptions;

use davisbase::storage::page::TableLeafCell;
use davisbase::storage::table::{Scan, Table};
use davisbase::types::error::DatabaseError;
use davisbase::types::row::RowData;
use davisbase::types::value::{ColumnDefinition, ColumnType, ColumnValue};
use davisbase::types::NULL_PAGE_NO;
use tempfile::{tempdir, TempDir};

fn data_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", ColumnType::Int),
        ColumnDefinition::new("name", ColumnType::Text),
    ]
}

fn create_table(dir: &TempDir, name: &str, columns: Vec<ColumnDefinition>) -> Table {
    let path = dir.path().join(format!("{}.tbl", name));
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .unwrap();
    Table::create(name.to_string(), file, 1, 512, columns).unwrap()
}

fn data_row(id: i32, name: &str) -> RowData {
    RowData::new(vec![
        ColumnValue::Int(id),
        ColumnValue::Text(name.to_string()),
    ])
}

fn collect_rows(table: &mut Table) -> Vec<TableLeafCell> {
    let mut rows = Vec::new();
    table
        .map_over_records(|_, _, cell| {
            rows.push(cell);
            Ok(Scan::Continue)
        })
        .unwrap();
    rows
}

#[test]
fn fresh_table_is_one_empty_leaf_page() {
    let dir = tempdir().unwrap();
    let table = create_table(&dir, "t", data_columns());
    assert_eq!(table.root_page_no(), 0);
    assert_eq!(table.page_count(), 1);
    assert_eq!(table.next_row_id(), 1);

    let len = std::fs::metadata(dir.path().join("t.tbl")).unwrap().len();
    assert_eq!(len, 512);
}

#[test]
fn appends_assign_monotonic_row_ids() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    for i in 1..=5 {
        table.append_record(data_row(i, "row")).unwrap();
    }
    assert_eq!(table.next_row_id(), 6);

    let rows = collect_rows(&mut table);
    let row_ids: Vec<i32> = rows.iter().map(|cell| cell.row_id).collect();
    assert_eq!(row_ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn first_split_links_exactly_one_new_leaf() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    // 53-byte cells: nine fit a 512-byte leaf, the tenth splits it
    for i in 1..=9 {
        table.append_record(data_row(i, &"x".repeat(40))).unwrap();
        assert_eq!(table.page_count(), 1);
    }
    table.append_record(data_row(10, &"x".repeat(40))).unwrap();

    // old leaf 0, new leaf 1, fresh interior root 2
    assert_eq!(table.page_count(), 3);
    assert_eq!(table.root_page_no(), 2);

    let leaf0 = match table.get_page(0).unwrap() {
        davisbase::storage::page::Page::Leaf(leaf) => leaf,
        _ => panic!("page 0 should stay a leaf"),
    };
    assert_eq!(leaf0.right_sibling_page_no(), 1);
    let leaf1 = match table.get_page(1).unwrap() {
        davisbase::storage::page::Page::Leaf(leaf) => leaf,
        _ => panic!("page 1 should be the split leaf"),
    };
    assert_eq!(leaf1.right_sibling_page_no(), NULL_PAGE_NO);
    assert_eq!(leaf1.cell_count(), 1);
    assert_eq!(leaf1.min_row_id().unwrap(), 10);

    let root = match table.get_page(2).unwrap() {
        davisbase::storage::page::Page::Interior(page) => page,
        _ => panic!("page 2 should be the new root"),
    };
    assert_eq!(root.cell_count(), 1);
    let separator = root.cell(0).unwrap();
    assert_eq!(separator.left_child_page_no, 0);
    assert_eq!(separator.row_id, 10);
    assert_eq!(root.rightmost_child_page_no(), 1);
}

#[test]
fn full_scan_visits_forty_rows_in_insertion_order() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    for i in 1..=40 {
        table.append_record(data_row(i, &"x".repeat(40))).unwrap();
    }

    let rows = collect_rows(&mut table);
    assert_eq!(rows.len(), 40);
    for (index, cell) in rows.iter().enumerate() {
        assert_eq!(cell.row_id, index as i32 + 1);
        assert_eq!(cell.payload.values[0], ColumnValue::Int(index as i32 + 1));
    }

    // every allocated page is committed, so the file is an exact multiple
    // of the page length
    let len = std::fs::metadata(dir.path().join("t.tbl")).unwrap().len();
    assert_eq!(len, table.page_count() as u64 * 512);
    assert!(table.page_count() > 3);
}

#[test]
fn leaf_chain_row_ids_strictly_increase() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    for i in 1..=40 {
        table.append_record(data_row(i, &"x".repeat(40))).unwrap();
    }

    let mut last = 0;
    table
        .map_over_records(|_, _, cell| {
            assert!(cell.row_id > last, "row ids must strictly increase");
            last = cell.row_id;
            Ok(Scan::Continue)
        })
        .unwrap();
    assert_eq!(last, 40);
}

#[test]
fn payload_fit_boundary_raises_payload_too_large() {
    let dir = tempdir().unwrap();
    let columns = vec![
        ColumnDefinition::new("a", ColumnType::Text),
        ColumnDefinition::new("b", ColumnType::Text),
        ColumnDefinition::new("c", ColumnType::Text),
    ];

    // cell length 500: header(9) + slot(2) + 500 = 511 < 512
    let mut table = create_table(&dir, "fits", columns.clone());
    table
        .append_record(RowData::new(vec![
            ColumnValue::Text("x".repeat(243)),
            ColumnValue::Text("y".repeat(243)),
            ColumnValue::Text("z".repeat(4)),
        ]))
        .unwrap();
    assert_eq!(table.page_count(), 1);

    // one byte longer can never fit, even in an empty page
    let mut table = create_table(&dir, "too_big", columns);
    let err = table
        .append_record(RowData::new(vec![
            ColumnValue::Text("x".repeat(243)),
            ColumnValue::Text("y".repeat(243)),
            ColumnValue::Text("z".repeat(5)),
        ]))
        .unwrap_err();
    assert!(matches!(err, DatabaseError::PayloadTooLarge { length: 495 }));
    assert_eq!(table.page_count(), 1);
    assert_eq!(table.next_row_id(), 1);
}

#[test]
fn interior_split_keeps_every_row_reachable_by_scan() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    // nine 53-byte cells per leaf and fifty separators per interior page:
    // 470 rows overflow the first interior root and grow a second level
    for i in 1..=470 {
        table.append_record(data_row(i, &"x".repeat(40))).unwrap();
    }

    let rows = collect_rows(&mut table);
    assert_eq!(rows.len(), 470);
    for (index, cell) in rows.iter().enumerate() {
        assert_eq!(cell.row_id, index as i32 + 1);
    }

    let len = std::fs::metadata(dir.path().join("t.tbl")).unwrap().len();
    assert_eq!(len, table.page_count() as u64 * 512);

    // appends still land on the rightmost leaf through two interior levels
    table.append_record(data_row(471, "tail")).unwrap();
    let rows = collect_rows(&mut table);
    assert_eq!(rows.last().unwrap().row_id, 471);
}

#[test]
fn routed_updates_reach_every_row_across_interior_splits() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    // leaves hold nine 53-byte cells and interior pages fifty separators:
    // the root interior splits at row 460 and the next interior at row
    // 910, so 920 rows build a three-level tree with two interior splits
    for i in 1..=920 {
        table.append_record(data_row(i, &"x".repeat(40))).unwrap();
    }

    // point-route to every row, including the ranges that sit between an
    // old interior page's last separator and the split boundary
    for row_id in 1..=920 {
        let replacement = TableLeafCell::new(
            row_id,
            RowData::new(vec![
                ColumnValue::Int(-row_id),
                ColumnValue::Text("y".repeat(40)),
            ]),
        );
        table.update_record(&replacement).unwrap();
    }

    let rows = collect_rows(&mut table);
    assert_eq!(rows.len(), 920);
    for (index, cell) in rows.iter().enumerate() {
        let row_id = index as i32 + 1;
        assert_eq!(cell.row_id, row_id);
        assert_eq!(cell.payload.values[0], ColumnValue::Int(-row_id));
        assert_eq!(
            cell.payload.values[1],
            ColumnValue::Text("y".repeat(40))
        );
    }
}

#[test]
fn update_record_overwrites_in_place() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    table.append_record(data_row(1, "aaaa")).unwrap();
    table.append_record(data_row(2, "bbbb")).unwrap();

    let mut cell = collect_rows(&mut table)[0].clone();
    cell.payload.values[1] = ColumnValue::Text("zz".to_string());
    table.update_record(&cell).unwrap();

    let rows = collect_rows(&mut table);
    assert_eq!(rows[0].payload.values[1], ColumnValue::Text("zz".to_string()));
    assert_eq!(rows[1].payload.values[1], ColumnValue::Text("bbbb".to_string()));

    let mut grown = rows[0].clone();
    grown.payload.values[1] = ColumnValue::Text("way too long".to_string());
    let err = table.update_record(&grown).unwrap_err();
    assert!(matches!(err, DatabaseError::UpdateGrowsCell { row_id: 1 }));
}

#[test]
fn delete_while_scanning_revisits_shifted_slots() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    for i in 1..=5 {
        table.append_record(data_row(i, "row")).unwrap();
    }

    // delete every even id while scanning
    table
        .map_over_records(|index, page, cell| {
            if let ColumnValue::Int(id) = cell.payload.values[0] {
                if id % 2 == 0 {
                    page.delete_record(index)?;
                    return Ok(Scan::Goto(index));
                }
            }
            Ok(Scan::Continue)
        })
        .unwrap();

    let row_ids: Vec<i32> = collect_rows(&mut table).iter().map(|c| c.row_id).collect();
    assert_eq!(row_ids, vec![1, 3, 5]);
}

#[test]
fn delete_at_slot_zero_keeps_scanning() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    for i in 1..=4 {
        table.append_record(data_row(i, "row")).unwrap();
    }

    // matches at slot 0 repeatedly as the array shifts down
    table
        .map_over_records(|index, page, _cell| {
            page.delete_record(index)?;
            Ok(Scan::Goto(index))
        })
        .unwrap();

    assert!(collect_rows(&mut table).is_empty());
}

#[test]
fn scan_stops_early_on_stop() {
    let dir = tempdir().unwrap();
    let mut table = create_table(&dir, "t", data_columns());
    for i in 1..=5 {
        table.append_record(data_row(i, "row")).unwrap();
    }

    let mut seen = 0;
    let finished = table
        .map_over_records(|_, _, _| {
            seen += 1;
            if seen == 3 {
                return Ok(Scan::Stop);
            }
            Ok(Scan::Continue)
        })
        .unwrap();
    assert!(!finished);
    assert_eq!(seen, 3);
}

#[test]
fn reopened_table_reads_back_persisted_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tbl");
    {
        let mut table = create_table(&dir, "t", data_columns());
        for i in 1..=12 {
            table.append_record(data_row(i, &"x".repeat(40))).unwrap();
        }
        // handle dropped, file stays
        assert_eq!(table.page_count(), 3);
    }

    let file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut table = Table::new("t".to_string(), file, 2, 13, 3, 512, data_columns());
    let rows = collect_rows(&mut table);
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[11].payload.values[0], ColumnValue::Int(12));
}
