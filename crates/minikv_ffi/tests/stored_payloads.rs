//! Stored records whose payload no longer decodes.

use minikv_core::journal::{Journal, Record};
use minikv_core::{ErrorCode, ValueType, JOURNAL_FILE};
use minikv_ffi::{
    minikv_free_buffer, minikv_get_bool, minikv_get_str, minikv_instance_free, minikv_open,
    TypeToken,
};
use minikv_storage::FileBackend;
use std::ffi::CString;
use std::path::Path;
use tempfile::tempdir;

fn write_journal(dir: &Path, records: &[Record]) {
    let backend = FileBackend::open(&dir.join(JOURNAL_FILE)).unwrap();
    let mut journal = Journal::new(Box::new(backend), None, false);
    for record in records {
        journal.append(record).unwrap();
    }
    journal.sync().unwrap();
}

#[test]
fn bad_payload_surfaces_as_decode_failed() {
    let dir = tempdir().unwrap();
    write_journal(
        dir.path(),
        &[
            Record::Put {
                key: "flag".into(),
                value_type: ValueType::Bool,
                payload: vec![2],
            },
            Record::Put {
                key: "name".into(),
                value_type: ValueType::Str,
                payload: vec![2, 0, 0, 0, 0xff, 0xfe],
            },
        ],
    );

    let path = CString::new(dir.path().to_str().unwrap()).unwrap();
    let flag = CString::new("flag").unwrap();
    let name = CString::new("name").unwrap();
    unsafe {
        let handle = minikv_open(path.as_ptr(), std::ptr::null());
        assert!(!handle.is_null());

        let buffer = minikv_get_bool(handle, flag.as_ptr());
        assert!((*buffer).raw_data.is_null());
        assert_eq!((*buffer).type_token, TypeToken::Bool);
        assert_eq!((*(*buffer).err).code, ErrorCode::DecodeFailed.wire());
        minikv_free_buffer(buffer);

        let buffer = minikv_get_str(handle, name.as_ptr());
        assert_eq!((*(*buffer).err).code, ErrorCode::DecodeFailed.wire());
        minikv_free_buffer(buffer);

        minikv_instance_free(handle);
    }
}
