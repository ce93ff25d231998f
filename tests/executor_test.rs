use davisbase::executor;
use davisbase::planner::parse_command;
use davisbase::storage::database::Database;
use davisbase::types::error::{DatabaseError, Result};
use tempfile::{tempdir, TempDir};

fn open_db(dir: &TempDir) -> Database {
    Database::open(dir.path(), 512).unwrap()
}

fn run(db: &mut Database, sql: &str) -> Result<String> {
    let command = parse_command(sql)?;
    let mut out = Vec::new();
    executor::execute(db, command, &mut out)?;
    Ok(String::from_utf8(out).expect("query output is utf-8"))
}

fn run_ok(db: &mut Database, sql: &str) -> String {
    match run(db, sql) {
        Ok(output) => output,
        Err(err) => panic!("{sql} failed: {err}"),
    }
}

#[test]
fn show_create_drop_round_trip() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);

    assert_eq!(
        run_ok(&mut db, "SHOW TABLES;"),
        "davisbase_tables\ndavisbase_columns\n"
    );

    run_ok(&mut db, "CREATE TABLE t (id INT PRIMARY KEY, name TEXT);");
    assert_eq!(
        run_ok(&mut db, "SHOW TABLES;"),
        "davisbase_tables\ndavisbase_columns\nt\n"
    );

    run_ok(&mut db, "DROP TABLE t;");
    assert_eq!(
        run_ok(&mut db, "SHOW TABLES;"),
        "davisbase_tables\ndavisbase_columns\n"
    );
}

#[test]
fn insert_and_select_all() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT PRIMARY KEY, name TEXT);");
    run_ok(&mut db, "INSERT INTO t VALUES (1, 'a');");
    run_ok(&mut db, "INSERT INTO t VALUES (2, 'b');");
    run_ok(&mut db, "INSERT INTO t VALUES (3, 'c');");

    assert_eq!(
        run_ok(&mut db, "SELECT * FROM t;"),
        "rowid|id|name\n1|1|a\n2|2|b\n3|3|c\n"
    );
}

#[test]
fn delete_with_where_removes_matches_only() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT PRIMARY KEY, name TEXT);");
    run_ok(&mut db, "INSERT INTO t VALUES (1, 'a');");
    run_ok(&mut db, "INSERT INTO t VALUES (2, 'b');");
    run_ok(&mut db, "INSERT INTO t VALUES (3, 'c');");

    run_ok(&mut db, "DELETE FROM t WHERE id = 2;");
    assert_eq!(
        run_ok(&mut db, "SELECT * FROM t WHERE id >= 2;"),
        "rowid|id|name\n3|3|c\n"
    );
}

#[test]
fn delete_without_where_is_refused() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT);");
    let err = run(&mut db, "DELETE FROM t;").unwrap_err();
    assert!(matches!(err, DatabaseError::WhereRequired));
}

#[test]
fn update_in_place_and_unique_pre_scan() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT PRIMARY KEY, name TEXT);");
    run_ok(&mut db, "INSERT INTO t VALUES (1, 'a');");
    run_ok(&mut db, "INSERT INTO t VALUES (2, 'b');");
    run_ok(&mut db, "INSERT INTO t VALUES (3, 'c');");

    run_ok(&mut db, "UPDATE t SET name = 'z' WHERE id = 1;");
    assert_eq!(
        run_ok(&mut db, "SELECT name FROM t WHERE id = 1;"),
        "rowid|name\n1|z\n"
    );

    let err = run(&mut db, "UPDATE t SET id = 2 WHERE id = 3;").unwrap_err();
    assert!(matches!(err, DatabaseError::UniqueViolation { .. }));
}

#[test]
fn insert_enforces_not_null() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT NOT NULL, name TEXT);");
    let err = run(&mut db, "INSERT INTO t (name) VALUES ('x');").unwrap_err();
    assert!(matches!(err, DatabaseError::NullConstraint { .. }));
}

#[test]
fn insert_enforces_primary_key_uniqueness() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT PRIMARY KEY, name TEXT);");
    run_ok(&mut db, "INSERT INTO t VALUES (1, 'a');");
    let err = run(&mut db, "INSERT INTO t VALUES (1, 'b');").unwrap_err();
    assert!(matches!(err, DatabaseError::UniqueViolation { .. }));
}

#[test]
fn named_insert_fills_missing_columns_with_null() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT DEFAULT 'd');");
    run_ok(&mut db, "INSERT INTO t (id) VALUES (9);");
    // the parsed DEFAULT is not applied; omitted columns stay NULL
    assert_eq!(run_ok(&mut db, "SELECT * FROM t;"), "rowid|id|name\n1|9|NULL\n");
}

#[test]
fn insert_rejects_unknown_columns_and_bad_counts() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT);");

    let err = run(&mut db, "INSERT INTO t (nope) VALUES (1);").unwrap_err();
    assert!(matches!(err, DatabaseError::ColumnNotFound { .. }));

    let err = run(&mut db, "INSERT INTO t VALUES (1);").unwrap_err();
    assert!(matches!(err, DatabaseError::ColumnCountMismatch { .. }));

    let err = run(&mut db, "INSERT INTO missing VALUES (1);").unwrap_err();
    assert!(matches!(err, DatabaseError::TableNotFound { .. }));
}

#[test]
fn where_null_matches_only_null_cells() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT);");
    run_ok(&mut db, "INSERT INTO t VALUES (1, 'a');");
    run_ok(&mut db, "INSERT INTO t VALUES (2, NULL);");

    assert_eq!(
        run_ok(&mut db, "SELECT id FROM t WHERE name = NULL;"),
        "rowid|id\n2|2\n"
    );
    // ordering comparisons against NULL match nothing
    assert_eq!(run_ok(&mut db, "SELECT id FROM t WHERE name > NULL;"), "rowid|id\n");
}

#[test]
fn create_index_requires_distinct_values() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT);");
    run_ok(&mut db, "INSERT INTO t VALUES (1, 'a');");
    run_ok(&mut db, "INSERT INTO t VALUES (2, 'a');");

    let err = run(&mut db, "CREATE UNIQUE INDEX ON t (name);").unwrap_err();
    assert!(matches!(err, DatabaseError::UniqueViolation { .. }));

    // id values are distinct, so the column becomes unique
    run_ok(&mut db, "CREATE INDEX ON t (id);");
    let err = run(&mut db, "INSERT INTO t VALUES (1, 'c');").unwrap_err();
    assert!(matches!(err, DatabaseError::UniqueViolation { .. }));
}

#[test]
fn forty_wide_rows_split_and_scan_back_in_order() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT);");
    let name = "n".repeat(40);
    for i in 1..=40 {
        run_ok(&mut db, &format!("INSERT INTO t VALUES ({i}, '{name}');"));
    }

    let output = run_ok(&mut db, "SELECT * FROM t;");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 41);
    assert_eq!(lines[0], "rowid|id|name");
    for (i, line) in lines[1..].iter().enumerate() {
        let row = i + 1;
        assert_eq!(*line, format!("{row}|{row}|{name}"));
    }

    // the file stays an exact multiple of the page length
    let table = db.get_table("t").unwrap().unwrap();
    let len = std::fs::metadata(dir.path().join("t.tbl")).unwrap().len();
    assert_eq!(len, table.page_count() as u64 * 512);
    assert!(table.page_count() > 1);
}

#[test]
fn select_output_matches_after_reopen() {
    let dir = tempdir().unwrap();
    let first = {
        let mut db = open_db(&dir);
        run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT);");
        for i in 1..=12 {
            run_ok(&mut db, &format!("INSERT INTO t VALUES ({i}, 'row{i}');"));
        }
        run_ok(&mut db, "SELECT * FROM t;")
    };

    let mut db = open_db(&dir);
    assert_eq!(run_ok(&mut db, "SELECT * FROM t;"), first);
}

#[test]
fn query_errors_name_missing_tables_and_columns() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    let err = run(&mut db, "SELECT * FROM missing;").unwrap_err();
    assert!(matches!(err, DatabaseError::TableNotFound { .. }));

    run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT);");
    let err = run(&mut db, "SELECT nope FROM t;").unwrap_err();
    assert!(matches!(err, DatabaseError::ColumnNotFound { .. }));
    let err = run(&mut db, "SELECT * FROM t WHERE nope = 1;").unwrap_err();
    assert!(matches!(err, DatabaseError::ColumnNotFound { .. }));
}

#[test]
fn schema_tables_answer_queries_like_any_table() {
    let dir = tempdir().unwrap();
    let mut db = open_db(&dir);
    run_ok(&mut db, "CREATE TABLE t (id INT, name TEXT);");

    let output = run_ok(
        &mut db,
        "SELECT table_name, page_length FROM davisbase_tables WHERE table_name = 't';",
    );
    assert_eq!(output, "rowid|table_name|page_length\n3|t|512\n");
}
