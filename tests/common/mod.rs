use slotdb::{FieldKind, Tuple, TupleDesc, Value};

/// A path under the system temp directory, unique per call. Replaces the
/// teacher's practice of writing fixed-named `.db` files into the crate
/// root, which made parallel test runs collide.
pub fn temp_db_path() -> String {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_str().unwrap().to_string();
    // the file must survive past this function; drop the handle but keep
    // the path, since the storage engine reopens it by name.
    tmp.close().ok();
    path
}

pub fn schema() -> TupleDesc {
    TupleDesc::new(
        vec![FieldKind::Int, FieldKind::Char, FieldKind::Double],
        vec!["id".into(), "name".into(), "price".into()],
    )
    .unwrap()
}

pub fn row(id: i32) -> Tuple {
    Tuple::new(vec![Value::Int(id), Value::Char("apple".into()), Value::Double(1.0)])
}
