mod common;

use common::{row, schema, temp_db_path};
use slotdb::Database;

#[test]
fn heap_append_spills_to_a_second_page() {
    let path = temp_db_path();
    let mut db = Database::new();
    db.create_heap_table(&path, schema()).unwrap();

    // Insert enough rows to force at least one page boundary; the exact
    // per-page capacity is a derived quantity, so overshoot generously.
    let n = 200;
    for i in 0..n {
        db.insert(&path, &row(i)).unwrap();
    }

    assert!(db.num_pages(&path).unwrap() >= 2);

    let mut seen = 0;
    let end = db.end(&path).unwrap();
    let mut it = db.begin(&path).unwrap();
    while it != end {
        let _ = db.get_row(&path, it).unwrap();
        seen += 1;
        it = db.advance(&path, it).unwrap();
    }
    assert_eq!(seen, n);
}

#[test]
fn deleted_slot_is_skipped_on_iteration() {
    let path = temp_db_path();
    let mut db = Database::new();
    db.create_heap_table(&path, schema()).unwrap();

    let rid0 = db.heap_insert(&path, &row(0)).unwrap();
    db.heap_insert(&path, &row(1)).unwrap();
    db.heap_insert(&path, &row(2)).unwrap();
    db.delete(&path, rid0).unwrap();

    let mut ids = Vec::new();
    let end = db.end(&path).unwrap();
    let mut it = db.begin(&path).unwrap();
    while it != end {
        ids.push(db.get_row(&path, it).unwrap().key(0));
        it = db.advance(&path, it).unwrap();
    }
    assert_eq!(ids, vec![1, 2]);
}
