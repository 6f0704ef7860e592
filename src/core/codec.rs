//! # Vector Codec
//!
//! Framing for the binary data phase. Everything is big-endian.
//!
//! ```text
//! Request:  [count:u32] then count x ( [len:u32] [f64 x len] )
//! Response: [count:u32] [f64 x count]
//! ```
//!
//! Doubles travel as their raw IEEE-754 bit pattern; decoding is a pure bit
//! transfer with no numeric conversion.
//!
//! [`VectorCodec`] is the server side (decodes batches, encodes results) and
//! [`ResultCodec`] the peer side (encodes batches, decodes results). The server
//! decoder is incremental: it consumes whatever is buffered and resumes on the
//! next call, so a batch never has to fit in one read.

use crate::core::{ResultSet, VectorBatch};
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Size of a count field on the wire.
pub const COUNT_LEN: usize = 4;

/// Size of one element on the wire.
pub const ELEMENT_LEN: usize = 8;

/// Upper bound on capacity reserved up front from a peer-declared count.
const MAX_PREALLOC: usize = 4096;

/// Interpret 4 bytes as a big-endian `u32`.
#[inline]
pub fn decode_count(bytes: [u8; COUNT_LEN]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// Interpret 8 bytes as the big-endian bit pattern of an `f64`.
#[inline]
pub fn decode_element(bytes: [u8; ELEMENT_LEN]) -> f64 {
    f64::from_bits(u64::from_be_bytes(bytes))
}

/// Big-endian bit pattern of an `f64`.
#[inline]
pub fn encode_element(value: f64) -> [u8; ELEMENT_LEN] {
    value.to_bits().to_be_bytes()
}

/// Consume a count field. The caller checks that it is buffered.
fn take_count(src: &mut BytesMut) -> u32 {
    let mut bytes = [0u8; COUNT_LEN];
    src.copy_to_slice(&mut bytes);
    decode_count(bytes)
}

/// Consume one element. The caller checks that it is buffered.
fn take_element(src: &mut BytesMut) -> f64 {
    let mut bytes = [0u8; ELEMENT_LEN];
    src.copy_to_slice(&mut bytes);
    decode_element(bytes)
}

fn wire_count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ProtocolError::OversizedResultSet(len))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for the batch count.
    Count,
    /// Waiting for the element count of the next vector.
    Length { vectors_left: u32 },
    /// Reading elements of the current vector.
    Elements { vectors_left: u32, elements_left: u32 },
}

/// Server-side data-phase codec.
#[derive(Debug)]
pub struct VectorCodec {
    state: DecodeState,
    batch: VectorBatch,
    current: Vec<f64>,
}

impl Default for VectorCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorCodec {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Count,
            batch: Vec::new(),
            current: Vec::new(),
        }
    }

    /// True once the batch count has been consumed and the batch is not yet complete.
    pub fn in_progress(&self) -> bool {
        self.state != DecodeState::Count
    }

    /// Vectors fully decoded so far in the current batch.
    pub fn vectors_decoded(&self) -> usize {
        self.batch.len()
    }

    /// Close the current vector; returns the batch if it was the last one.
    fn finish_vector(&mut self, vectors_left: u32) -> Option<VectorBatch> {
        self.batch.push(std::mem::take(&mut self.current));
        let vectors_left = vectors_left - 1;
        if vectors_left == 0 {
            self.state = DecodeState::Count;
            Some(std::mem::take(&mut self.batch))
        } else {
            self.state = DecodeState::Length { vectors_left };
            None
        }
    }
}

impl Decoder for VectorCodec {
    type Item = VectorBatch;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.state {
                DecodeState::Count => {
                    if src.len() < COUNT_LEN {
                        return Ok(None);
                    }
                    let count = take_count(src);
                    if count == 0 {
                        return Ok(Some(Vec::new()));
                    }
                    self.batch = Vec::with_capacity((count as usize).min(MAX_PREALLOC));
                    self.state = DecodeState::Length {
                        vectors_left: count,
                    };
                }
                DecodeState::Length { vectors_left } => {
                    if src.len() < COUNT_LEN {
                        return Ok(None);
                    }
                    let len = take_count(src);
                    self.current = Vec::with_capacity((len as usize).min(MAX_PREALLOC));
                    if len == 0 {
                        if let Some(batch) = self.finish_vector(vectors_left) {
                            return Ok(Some(batch));
                        }
                    } else {
                        self.state = DecodeState::Elements {
                            vectors_left,
                            elements_left: len,
                        };
                    }
                }
                DecodeState::Elements {
                    vectors_left,
                    elements_left,
                } => {
                    let ready = (src.len() / ELEMENT_LEN).min(elements_left as usize);
                    if ready == 0 {
                        src.reserve(ELEMENT_LEN);
                        return Ok(None);
                    }
                    for _ in 0..ready {
                        self.current.push(take_element(src));
                    }
                    // ready <= elements_left, which is a u32
                    let elements_left = elements_left - ready as u32;
                    if elements_left > 0 {
                        self.state = DecodeState::Elements {
                            vectors_left,
                            elements_left,
                        };
                        return Ok(None);
                    }
                    if let Some(batch) = self.finish_vector(vectors_left) {
                        return Ok(Some(batch));
                    }
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(batch) => Ok(Some(batch)),
            None if src.is_empty() && !self.in_progress() => Ok(None),
            None => Err(ProtocolError::TruncatedFrame(src.len())),
        }
    }
}

impl Encoder<ResultSet> for VectorCodec {
    type Error = ProtocolError;

    fn encode(&mut self, results: ResultSet, dst: &mut BytesMut) -> Result<()> {
        let count = wire_count(results.len())?;
        dst.reserve(COUNT_LEN + results.len() * ELEMENT_LEN);
        dst.put_u32(count);
        for value in results {
            dst.put_slice(&encode_element(value));
        }
        Ok(())
    }
}

/// Peer-side data-phase codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultCodec;

impl Decoder for ResultCodec {
    type Item = ResultSet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < COUNT_LEN {
            return Ok(None);
        }
        let mut header = [0u8; COUNT_LEN];
        header.copy_from_slice(&src[..COUNT_LEN]);
        let count = decode_count(header) as usize;

        let frame_len = count
            .checked_mul(ELEMENT_LEN)
            .and_then(|body| body.checked_add(COUNT_LEN))
            .ok_or(ProtocolError::OversizedResultSet(count))?;
        if src.len() < frame_len {
            // The count is the server's claim; grow with the bytes that actually arrive.
            src.reserve((frame_len - src.len()).min(MAX_PREALLOC * ELEMENT_LEN));
            return Ok(None);
        }

        src.advance(COUNT_LEN);
        let results = (0..count).map(|_| take_element(src)).collect();
        Ok(Some(results))
    }
}

impl Encoder<VectorBatch> for ResultCodec {
    type Error = ProtocolError;

    fn encode(&mut self, batch: VectorBatch, dst: &mut BytesMut) -> Result<()> {
        let elements: usize = batch.iter().map(Vec::len).sum();
        dst.reserve(COUNT_LEN * (1 + batch.len()) + elements * ELEMENT_LEN);
        dst.put_u32(wire_count(batch.len())?);
        for vector in batch {
            dst.put_u32(wire_count(vector.len())?);
            for value in vector {
                dst.put_slice(&encode_element(value));
            }
        }
        Ok(())
    }
}
