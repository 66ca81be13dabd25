//! Recovery from damaged journals.

use minikv_core::journal::{Journal, Record, FRAME_HEADER_SIZE};
use minikv_core::{Config, CoreError, ErrorCode, Store, ValueType, JOURNAL_FILE};
use minikv_storage::{FileBackend, InMemoryBackend, StorageBackend};
use minikv_testkit::{append_garbage, chop_tail, flip_byte, CrashableBackend, TempStore};

fn journal_bytes(fixture: &TempStore) -> u64 {
    fixture.stats().unwrap().journal_bytes
}

#[test]
fn torn_last_record_is_dropped() {
    let mut fixture = TempStore::open();
    fixture.put_typed("first", 1i32).unwrap();
    fixture.put_typed("second", String::from("two")).unwrap();
    fixture.close();

    chop_tail(&fixture.journal_path(), 3).unwrap();
    fixture.reopen();

    assert_eq!(fixture.get::<i32>("first").unwrap(), 1);
    assert_eq!(
        fixture.get::<String>("second").unwrap_err().code(),
        ErrorCode::KeyNotFound
    );

    // The torn tail was cut, so new writes land after the intact records.
    fixture.put_typed("third", true).unwrap();
    fixture.reopen();
    assert!(fixture.get::<bool>("third").unwrap());
}

#[test]
fn corrupt_last_record_is_dropped() {
    let mut fixture = TempStore::open();
    fixture.put_typed("keep", 7i64).unwrap();
    let before_last = journal_bytes(&fixture);
    fixture.put_typed("lose", 8i64).unwrap();
    fixture.close();

    flip_byte(&fixture.journal_path(), before_last + FRAME_HEADER_SIZE as u64 + 1).unwrap();
    fixture.reopen();

    assert_eq!(fixture.get::<i64>("keep").unwrap(), 7);
    assert!(matches!(
        fixture.get::<i64>("lose"),
        Err(CoreError::KeyNotFound { .. })
    ));
    assert_eq!(journal_bytes(&fixture), before_last);
}

#[test]
fn trailing_garbage_is_ignored() {
    let mut fixture = TempStore::open();
    fixture.put_typed("bytes", vec![1u8, 2, 3]).unwrap();
    fixture.close();

    append_garbage(&fixture.journal_path(), &[0xff, 0xff, 0xff, 0x7f, 0, 0]).unwrap();
    fixture.reopen();
    assert_eq!(fixture.get::<Vec<u8>>("bytes").unwrap(), [1, 2, 3]);
}

#[test]
fn crash_mid_append_leaves_earlier_records() {
    let memory = InMemoryBackend::new();
    let (backend, control) = CrashableBackend::new(Box::new(memory.clone()));
    let mut journal = Journal::new(Box::new(backend), None, false);

    let first = Record::Put {
        key: "a".into(),
        value_type: ValueType::I32,
        payload: 5i32.to_le_bytes().to_vec(),
    };
    journal.append(&first).unwrap();
    control.crash_after(6);
    assert!(journal.append(&Record::Delete { key: "a".into() }).is_err());
    assert!(control.has_crashed());

    let mut replayed = Journal::new(Box::new(memory.clone()), None, false);
    let replay = replayed.replay().unwrap();
    assert_eq!(replay.records.len(), 1);
    assert_eq!(replay.records[0].0.key(), "a");
    assert_eq!(replay.truncated, 6);
    assert_eq!(memory.size().unwrap(), replay.records[0].1);
}

#[test]
fn values_survive_many_reopens() {
    let mut fixture = TempStore::open();
    for round in 0..5i64 {
        fixture.put_typed("counter", round).unwrap();
        fixture.put_typed(&format!("round{round}"), round as f64).unwrap();
        fixture.reopen();
    }
    assert_eq!(fixture.get::<i64>("counter").unwrap(), 4);
    assert_eq!(fixture.len(), 6);
    assert_eq!(fixture.get::<f64>("round3").unwrap(), 3.0);
}

#[test]
fn undecodable_payload_is_decode_failed() {
    let dir = tempfile::tempdir().unwrap();
    {
        let backend = FileBackend::open(&dir.path().join(JOURNAL_FILE)).unwrap();
        let mut journal = Journal::new(Box::new(backend), None, false);
        journal
            .append(&Record::Put {
                key: "flag".into(),
                value_type: ValueType::Bool,
                payload: vec![2],
            })
            .unwrap();
        journal
            .append(&Record::Put {
                key: "short".into(),
                value_type: ValueType::I32,
                payload: vec![1, 2, 3],
            })
            .unwrap();
        journal.sync().unwrap();
    }

    // The frames are intact, so replay keeps both records.
    let store = Store::open(Config::new(dir.path())).unwrap();
    assert_eq!(store.len(), 2);

    let error = store.get::<bool>("flag").unwrap_err();
    assert!(matches!(error, CoreError::Codec(_)), "{error}");
    assert_eq!(error.code(), ErrorCode::DecodeFailed);
    assert_eq!(
        store.get::<i32>("short").unwrap_err().code(),
        ErrorCode::DecodeFailed
    );
    assert_eq!(
        store.get_value("flag").unwrap_err().code(),
        ErrorCode::DecodeFailed
    );
    // A mismatched request is reported before any decoding.
    assert_eq!(
        store.get::<i64>("flag").unwrap_err().code(),
        ErrorCode::TypeMismatch
    );
}
