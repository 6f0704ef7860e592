//! Credential database loading from disk

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::io::Write;
use vcalc::credentials::{CredentialDb, CredentialStore};
use vcalc::error::{ErrorKind, ProtocolError};
use vcalc::protocol::verifier;

fn write_db(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

#[test]
fn test_load_file_with_mixed_lines() {
    let file = write_db(
        b"# vcalc credentials\n\
          \n\
          user:P@ssw0rd\n\
          alice : s3cret \n\
          broken line\n\
          :nologin\n",
    );

    let db = CredentialDb::load(file.path()).unwrap();
    assert_eq!(db.len(), 2);
    assert_eq!(db.lookup("user"), Some("P@ssw0rd"));
    assert_eq!(db.lookup("alice"), Some("s3cret"));
}

#[test]
fn test_load_crlf_file() {
    let file = write_db(b"user:P@ssw0rd\r\nalice:s3cret\r\n");
    let db = CredentialDb::load(file.path()).unwrap();
    assert_eq!(db.lookup("user"), Some("P@ssw0rd"));
    assert_eq!(db.lookup("alice"), Some("s3cret"));
}

#[test]
fn test_load_empty_file() {
    let file = write_db(b"");
    let db = CredentialDb::load(file.path()).unwrap();
    assert!(db.is_empty());
}

#[test]
fn test_missing_file_is_local_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CredentialDb::load(dir.path().join("absent.conf")).unwrap_err();

    assert!(matches!(err, ProtocolError::CredentialStore(_)));
    assert_eq!(err.kind(), ErrorKind::Local);
    assert!(err.to_string().contains("Failed to open credential database"));
}

#[test]
fn test_non_utf8_file_is_read_error() {
    let file = write_db(&[0xFF, 0xFE, b':', b'x', b'\n']);
    let err = CredentialDb::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to read credential database"));
}

#[test]
fn test_loaded_secret_verifies() {
    let file = write_db(b"user:P@ssw0rd\n");
    let db = CredentialDb::load(file.path()).unwrap();

    assert!(verifier::verify(
        &db,
        "user",
        "0000000000000000",
        "2A1150048DAC2B36EEFAF2C09655C0B3BE4C8242F8CC8BD7DA36B576",
    ));
    assert!(!verifier::verify(
        &db,
        "user",
        "0000000000000001",
        "2A1150048DAC2B36EEFAF2C09655C0B3BE4C8242F8CC8BD7DA36B576",
    ));
}
