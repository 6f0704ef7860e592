#![no_main]

use libfuzzer_sys::fuzz_target;
use vcalc::core::message::AuthRequest;

fuzz_target!(|data: &[u8]| {
    // Any byte string must parse or be rejected, never panic
    if let Ok(request) = AuthRequest::parse(data, "user") {
        assert_eq!(request.to_bytes(), data);
        let _ = request.redacted_hash();
    }
});
