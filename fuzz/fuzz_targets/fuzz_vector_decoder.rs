#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;
use vcalc::core::codec::VectorCodec;

fuzz_target!(|data: &[u8]| {
    // Feed the input in two pieces to exercise resumption, then hit EOF
    let split = data.first().map_or(0, |b| *b as usize).min(data.len());
    let mut codec = VectorCodec::new();
    let mut buf = BytesMut::from(&data[..split]);

    let _ = codec.decode(&mut buf);
    buf.extend_from_slice(&data[split..]);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
    let _ = codec.decode_eof(&mut buf);
});
