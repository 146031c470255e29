//! Record CRUD over a fresh database: scalar and hybrid round-trips,
//! deletes, and overwrite semantics.

use vexdb::{Db, DbOptions, Error, Record, Scalar, ScalarType, Schema};

fn tmp_dir(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("vexdb_{tag}_{}", uuid::Uuid::new_v4()))
}

#[test]
fn scalar_put_get() {
    let path = tmp_dir("crud_scalar");
    let mut schema = Schema::new();
    schema
        .add_scalar_field("name", ScalarType::String)
        .unwrap()
        .add_scalar_field("age", ScalarType::Integer)
        .unwrap()
        .add_scalar_field("height", ScalarType::Float)
        .unwrap();

    let mut db = Db::open_with_schema(&path, DbOptions::default(), schema).unwrap();

    for i in 0..10u64 {
        let record = Record::new(i)
            .with_scalar(Scalar::String(format!("Alice{i}")))
            .with_scalar(Scalar::Integer(20 + i as i64))
            .with_scalar(Scalar::Float(160.0 + i as f64));
        db.put_record(i, record).unwrap();
    }

    for i in 0..10u64 {
        let record = db.get_record(i).unwrap();
        assert_eq!(record.scalars[0], Scalar::String(format!("Alice{i}")));
        assert_eq!(record.scalars[1], Scalar::Integer(20 + i as i64));
        assert_eq!(record.scalars[2], Scalar::Float(160.0 + i as f64));
    }

    drop(db);
    let _ = std::fs::remove_dir_all(&path);
}

#[test]
fn hybrid_put_get() {
    let path = tmp_dir("crud_hybrid");
    let mut schema = Schema::new();
    schema
        .add_scalar_field("name", ScalarType::String)
        .unwrap()
        .add_scalar_field("age", ScalarType::Integer)
        .unwrap()
        .add_vector_field("v1", 3, 0)
        .unwrap()
        .add_vector_field("v2", 4, 0)
        .unwrap();

    let mut db = Db::open_with_schema(&path, DbOptions::default(), schema).unwrap();

    for i in 0..10u64 {
        let f = i as f32;
        let record = Record::new(i)
            .with_scalar(Scalar::String(format!("Alice{i}")))
            .with_scalar(Scalar::Integer(20 + i as i64))
            .with_vector(vec![1.0 * f, 3.0 * f, 5.0 * f])
            .with_vector(vec![2.0 * f, 4.0 * f, 6.0 * f, 8.0 * f]);
        db.put_record(i, record).unwrap();
    }

    for i in 0..10u64 {
        let f = i as f32;
        let record = db.get_record(i).unwrap();
        assert_eq!(record.scalars[0], Scalar::String(format!("Alice{i}")));
        assert_eq!(record.vectors[0], vec![1.0 * f, 3.0 * f, 5.0 * f]);
        assert_eq!(record.vectors[1], vec![2.0 * f, 4.0 * f, 6.0 * f, 8.0 * f]);
    }

    drop(db);
    let _ = std::fs::remove_dir_all(&path);
}

#[test]
fn delete_removes_record() {
    let path = tmp_dir("crud_delete");
    let mut schema = Schema::new();
    schema
        .add_scalar_field("name", ScalarType::String)
        .unwrap()
        .add_vector_field("vec", 4, 0)
        .unwrap();

    let mut db = Db::open_with_schema(&path, DbOptions::default(), schema).unwrap();

    for i in 0..10u64 {
        let f = i as f32;
        let record = Record::new(i)
            .with_scalar(Scalar::String(format!("Alice{i}")))
            .with_vector(vec![1.0 * f, 3.0 * f, 5.0 * f, 7.0 * f]);
        db.put_record(i, record).unwrap();
    }

    for i in 0..10u64 {
        assert!(db.get_record(i).is_ok());
        db.delete_record(i).unwrap();
        assert!(matches!(db.get_record(i), Err(Error::NotFound(_))));
    }
    assert!(matches!(db.delete_record(3), Err(Error::NotFound(_))));

    drop(db);
    let _ = std::fs::remove_dir_all(&path);
}

#[test]
fn put_overwrites_existing_key() {
    let path = tmp_dir("crud_overwrite");
    let mut schema = Schema::new();
    schema.add_scalar_field("age", ScalarType::Integer).unwrap();

    let mut db = Db::open_with_schema(&path, DbOptions::default(), schema).unwrap();
    db.put_record(1, Record::new(1).with_scalar(Scalar::Integer(30)))
        .unwrap();
    db.put_record(1, Record::new(1).with_scalar(Scalar::Integer(31)))
        .unwrap();
    assert_eq!(db.get_record(1).unwrap().scalars[0], Scalar::Integer(31));

    drop(db);
    let _ = std::fs::remove_dir_all(&path);
}

#[test]
fn malformed_records_rejected() {
    let path = tmp_dir("crud_malformed");
    let mut schema = Schema::new();
    schema
        .add_scalar_field("age", ScalarType::Integer)
        .unwrap()
        .add_vector_field("vec", 3, 0)
        .unwrap();

    let mut db = Db::open_with_schema(&path, DbOptions::default(), schema).unwrap();

    // Missing vector.
    let record = Record::new(1).with_scalar(Scalar::Integer(1));
    assert!(matches!(db.put_record(1, record), Err(Error::Shape(_))));

    // Wrong dimension.
    let record = Record::new(1)
        .with_scalar(Scalar::Integer(1))
        .with_vector(vec![1.0]);
    assert!(matches!(db.put_record(1, record), Err(Error::Shape(_))));

    // Wrong scalar type.
    let record = Record::new(1)
        .with_scalar(Scalar::Float(1.0))
        .with_vector(vec![1.0, 2.0, 3.0]);
    assert!(matches!(db.put_record(1, record), Err(Error::Schema(_))));

    drop(db);
    let _ = std::fs::remove_dir_all(&path);
}
