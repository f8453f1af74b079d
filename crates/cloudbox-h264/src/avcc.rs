use bytes::{BufMut, Bytes, BytesMut};
use cloudbox_core::{BitstreamError, EncodedFrame};

use crate::annexb::AnnexBReader;
use crate::nalu::{find_nalu_indices, NaluType, ANNEX_B_START_CODE};

/// Size of the big-endian length prefix in front of every AVCC NAL unit.
pub const AVCC_HEADER_SIZE: usize = 4;

// ── AvccWriter ─────────────────────────────────────────────────────────────────

/// Writes length-prefixed NAL units into a buffer of fixed capacity.
pub struct AvccWriter {
    buf: BytesMut,
    capacity: usize,
}

impl AvccWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), capacity }
    }

    pub fn write_nalu(&mut self, nalu: &[u8]) -> Result<(), BitstreamError> {
        let needed = nalu.len() + AVCC_HEADER_SIZE;
        if needed > self.bytes_remaining() {
            return Err(BitstreamError::BufferOverflow { needed, remaining: self.bytes_remaining() });
        }
        let len = u32::try_from(nalu.len()).map_err(|_| BitstreamError::BufferOverflow {
            needed,
            remaining: u32::MAX as usize,
        })?;
        self.buf.put_u32(len);
        self.buf.put_slice(nalu);
        Ok(())
    }

    pub fn bytes_remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

// ── Conversions ────────────────────────────────────────────────────────────────

/// Rewrites an Annex B access unit as AVCC.
///
/// SPS and PPS units are dropped wherever they appear (they travel in the
/// [`FormatDescription`](crate::FormatDescription)); every other NAL unit is
/// kept in order.
pub fn annexb_to_avcc(annexb: &[u8]) -> Result<Bytes, BitstreamError> {
    let mut reader = AnnexBReader::new(annexb);
    if reader.nalu_count() == 0 {
        return Err(BitstreamError::NoStartCode);
    }

    let mut nalus = Vec::new();
    while let Some(nalu) = reader.read_nalu() {
        let is_parameter_set =
            nalu.first().is_some_and(|&header| NaluType::from_header(header).is_parameter_set());
        if !is_parameter_set {
            nalus.push(nalu);
        }
    }
    let capacity = nalus.iter().map(|n| n.len() + AVCC_HEADER_SIZE).sum();
    let mut writer = AvccWriter::with_capacity(capacity);
    for nalu in nalus {
        writer.write_nalu(nalu)?;
    }
    Ok(writer.finish())
}

/// True when `buf` is exactly one NAL unit behind a 4-byte start code.
pub fn is_single_nalu(buf: &[u8]) -> bool {
    let indices = find_nalu_indices(buf);
    matches!(indices.as_slice(), [only] if only.start_offset == 0 && only.start_code_len() == 4)
}

/// Replaces the 4-byte start code of a single-NAL frame with its length,
/// reusing the frame's own buffer.
pub fn rewrite_single_nalu_in_place(mut frame: BytesMut) -> Result<Bytes, BitstreamError> {
    if !frame.starts_with(&ANNEX_B_START_CODE) {
        return Err(BitstreamError::NoStartCode);
    }
    let payload_len = frame.len() - AVCC_HEADER_SIZE;
    if payload_len == 0 {
        return Err(BitstreamError::Truncated { reason: "start code with no NAL unit".into() });
    }
    let len = u32::try_from(payload_len).map_err(|_| BitstreamError::Truncated {
        reason: format!("NAL unit of {payload_len} bytes exceeds the AVCC length field"),
    })?;
    frame[..AVCC_HEADER_SIZE].copy_from_slice(&len.to_be_bytes());
    Ok(frame.freeze())
}

// ── AvccSample ─────────────────────────────────────────────────────────────────

/// One access unit ready for a sample-based decoder.
#[derive(Debug, Clone)]
pub struct AvccSample {
    pub index: u64,
    pub data: Bytes,
    pub timestamp_us: u64,
    pub is_keyframe: bool,
}

impl AvccSample {
    pub fn from_frame(frame: &EncodedFrame) -> Result<Self, BitstreamError> {
        Ok(Self {
            index: frame.index,
            data: annexb_to_avcc(&frame.data)?,
            timestamp_us: frame.timestamp_us,
            is_keyframe: frame.is_keyframe,
        })
    }

    /// Parameter-set-only units convert to an empty sample.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Splits the sample back into its NAL units.
    pub fn nalus(&self) -> Result<Vec<&[u8]>, BitstreamError> {
        let mut out = Vec::new();
        let mut rest: &[u8] = &self.data;
        while !rest.is_empty() {
            if rest.len() < AVCC_HEADER_SIZE {
                return Err(BitstreamError::Truncated { reason: "partial length header".into() });
            }
            let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
            let body = &rest[AVCC_HEADER_SIZE..];
            if body.len() < len {
                return Err(BitstreamError::Truncated {
                    reason: format!("NAL unit claims {len} bytes, {} left", body.len()),
                });
            }
            out.push(&body[..len]);
            rest = &body[len..];
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn strips_parameter_sets_and_prefixes_lengths() {
        let avcc = annexb_to_avcc(&annexb(&[SPS, PPS, IDR])).unwrap();
        let mut expected = (IDR.len() as u32).to_be_bytes().to_vec();
        expected.extend_from_slice(IDR);
        assert_eq!(avcc.as_ref(), expected.as_slice());
    }

    #[test]
    fn keeps_everything_without_sps() {
        let avcc = annexb_to_avcc(&annexb(&[AUD, P_SLICE])).unwrap();
        assert_eq!(avcc.len(), AUD.len() + P_SLICE.len() + 2 * AVCC_HEADER_SIZE);
        assert_eq!(&avcc[..4], &(AUD.len() as u32).to_be_bytes());
    }

    #[test]
    fn three_byte_start_codes_fit() {
        let mut buf = vec![0, 0, 1];
        buf.extend_from_slice(P_SLICE);
        buf.extend_from_slice(&[0, 0, 1]);
        buf.extend_from_slice(P_SLICE_CONT);
        let avcc = annexb_to_avcc(&buf).unwrap();
        assert_eq!(avcc.len(), P_SLICE.len() + P_SLICE_CONT.len() + 8);
    }

    #[test]
    fn parameter_sets_are_dropped_anywhere() {
        let avcc = annexb_to_avcc(&annexb(&[PPS, IDR, SPS])).unwrap();
        assert_eq!(&avcc[4..], IDR);
        assert!(annexb_to_avcc(&annexb(&[SPS])).unwrap().is_empty());
        assert_eq!(annexb_to_avcc(b"plain text").unwrap_err(), BitstreamError::NoStartCode);
    }

    #[test]
    fn parameter_sets_only_give_empty_sample() {
        let frame = EncodedFrame {
            index: 7,
            data: Bytes::from(annexb(&[SPS, PPS])),
            timestamp_us: 0,
            is_keyframe: false,
        };
        let sample = AvccSample::from_frame(&frame).unwrap();
        assert!(sample.is_empty());
        assert_eq!(sample.index, 7);
    }

    #[test]
    fn writer_rejects_overflow() {
        let mut writer = AvccWriter::with_capacity(8);
        writer.write_nalu(&[1, 2, 3, 4]).unwrap();
        let err = writer.write_nalu(&[5]).unwrap_err();
        assert_eq!(err, BitstreamError::BufferOverflow { needed: 5, remaining: 0 });
    }

    #[test]
    fn single_nalu_rewritten_in_place() {
        let buf = annexb(&[IDR]);
        assert!(is_single_nalu(&buf));
        assert!(!is_single_nalu(&annexb(&[SPS, PPS])));

        let out = rewrite_single_nalu_in_place(BytesMut::from(buf.as_slice())).unwrap();
        assert_eq!(&out[..4], &(IDR.len() as u32).to_be_bytes());
        assert_eq!(&out[4..], IDR);
        assert_eq!(out, annexb_to_avcc(&buf).unwrap());
    }

    #[test]
    fn rewrite_requires_start_code() {
        let err = rewrite_single_nalu_in_place(BytesMut::from(&[0x65, 0x88][..])).unwrap_err();
        assert_eq!(err, BitstreamError::NoStartCode);
        let err = rewrite_single_nalu_in_place(BytesMut::from(&ANNEX_B_START_CODE[..])).unwrap_err();
        assert!(matches!(err, BitstreamError::Truncated { .. }));
    }

    #[test]
    fn sample_splits_back_into_nalus() {
        let frame = EncodedFrame {
            index: 0,
            data: Bytes::from(annexb(&[P_SLICE, P_SLICE_CONT])),
            timestamp_us: 0,
            is_keyframe: false,
        };
        let sample = AvccSample::from_frame(&frame).unwrap();
        assert_eq!(sample.nalus().unwrap(), vec![P_SLICE, P_SLICE_CONT]);
    }
}
