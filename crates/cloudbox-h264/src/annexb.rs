use bytes::Bytes;
use cloudbox_core::EncodedFrame;
use tracing::debug;

use crate::nalu::{find_nalu_indices, NaluIndex, NaluType};

/// Presentation interval assigned to split access units (nominal 30 fps).
pub const DEFAULT_FRAME_INTERVAL_US: u64 = 33_333;

// ── AnnexBReader ───────────────────────────────────────────────────────────────

/// Cursor over the NAL units of one Annex B buffer.
pub struct AnnexBReader<'a> {
    buffer: &'a [u8],
    offsets: Vec<NaluIndex>,
    pos: usize,
}

impl<'a> AnnexBReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offsets: find_nalu_indices(buffer), pos: 0 }
    }

    /// Returns the next NAL unit (without start code) and advances.
    pub fn read_nalu(&mut self) -> Option<&'a [u8]> {
        let index = self.offsets.get(self.pos)?;
        self.pos += 1;
        Some(index.payload(self.buffer))
    }

    /// Bytes from the current NAL's start code to the end of the buffer.
    pub fn bytes_remaining(&self) -> usize {
        match self.offsets.get(self.pos) {
            Some(index) => self.buffer.len() - index.start_offset,
            None => 0,
        }
    }

    pub fn seek_to_start(&mut self) {
        self.pos = 0;
    }

    /// Moves to the next NAL of type `nalu_type`, leaving it unread.
    /// Returns false (cursor at end) when there is none.
    pub fn seek_to_next_nalu_of_type(&mut self, nalu_type: NaluType) -> bool {
        while let Some(index) = self.offsets.get(self.pos) {
            if index.nalu_type(self.buffer) == Some(nalu_type) {
                return true;
            }
            self.pos += 1;
        }
        false
    }

    pub fn nalu_count(&self) -> usize {
        self.offsets.len()
    }
}

// ── AccessUnitSplitter ─────────────────────────────────────────────────────────

/// Splits an elementary stream into access units (one coded picture each).
///
/// A new unit opens at an AUD, or once the current unit holds slice data at
/// an SPS/PPS/SEI or at a slice whose `first_mb_in_slice` is zero.
pub struct AccessUnitSplitter {
    data: Bytes,
    nalus: Vec<NaluIndex>,
    pos: usize,
    frame_index: u64,
    frame_interval_us: u64,
}

impl AccessUnitSplitter {
    pub fn new(data: Bytes) -> Self {
        let nalus = find_nalu_indices(&data);
        debug!("Found {} NAL units in {} bytes", nalus.len(), data.len());
        Self { data, nalus, pos: 0, frame_index: 0, frame_interval_us: DEFAULT_FRAME_INTERVAL_US }
    }

    pub fn with_frame_interval_us(mut self, interval_us: u64) -> Self {
        self.frame_interval_us = interval_us;
        self
    }

    pub fn nalu_count(&self) -> usize {
        self.nalus.len()
    }

    fn opens_new_unit(&self, index: &NaluIndex, unit_has_vcl: bool) -> bool {
        let payload = index.payload(&self.data);
        let Some(&header) = payload.first() else {
            return false;
        };
        match NaluType::from_header(header) {
            NaluType::Aud => true,
            NaluType::Sps | NaluType::Pps | NaluType::Sei => unit_has_vcl,
            t if t.is_vcl() => unit_has_vcl && starts_new_picture(payload),
            _ => false,
        }
    }
}

impl Iterator for AccessUnitSplitter {
    type Item = EncodedFrame;

    fn next(&mut self) -> Option<EncodedFrame> {
        let first = *self.nalus.get(self.pos)?;
        let mut has_vcl = first.nalu_type(&self.data).map_or(false, |t| t.is_vcl());
        let mut is_keyframe = first.nalu_type(&self.data) == Some(NaluType::Idr);
        let mut end = self.pos + 1;

        while let Some(index) = self.nalus.get(end) {
            if self.opens_new_unit(index, has_vcl) {
                break;
            }
            match index.nalu_type(&self.data) {
                Some(NaluType::Idr) => {
                    has_vcl = true;
                    is_keyframe = true;
                }
                Some(t) if t.is_vcl() => has_vcl = true,
                _ => {}
            }
            end += 1;
        }

        let last = self.nalus[end - 1];
        let data = self
            .data
            .slice(first.start_offset..last.payload_start_offset + last.payload_size);
        let frame = EncodedFrame {
            index: self.frame_index,
            data,
            timestamp_us: self.frame_index * self.frame_interval_us,
            is_keyframe,
        };

        self.pos = end;
        self.frame_index += 1;
        Some(frame)
    }
}

/// `first_mb_in_slice` is ue(v) right after the header; zero encodes as a
/// single leading `1` bit.
fn starts_new_picture(payload: &[u8]) -> bool {
    payload.get(1).map_or(true, |b| b & 0x80 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn reader_walks_nalus_in_order() {
        let buf = annexb(&[SPS, PPS, IDR]);
        let mut reader = AnnexBReader::new(&buf);
        assert_eq!(reader.nalu_count(), 3);
        assert_eq!(reader.bytes_remaining(), buf.len());
        assert_eq!(reader.read_nalu(), Some(SPS));
        assert_eq!(reader.read_nalu(), Some(PPS));
        assert_eq!(reader.bytes_remaining(), 4 + IDR.len());
        assert_eq!(reader.read_nalu(), Some(IDR));
        assert_eq!(reader.read_nalu(), None);
        assert_eq!(reader.bytes_remaining(), 0);
    }

    #[test]
    fn reader_seeks_by_type() {
        let buf = annexb(&[AUD, SPS, PPS, IDR]);
        let mut reader = AnnexBReader::new(&buf);
        assert!(reader.seek_to_next_nalu_of_type(NaluType::Sps));
        assert_eq!(reader.read_nalu(), Some(SPS));
        assert!(!reader.seek_to_next_nalu_of_type(NaluType::Sps));
        assert_eq!(reader.read_nalu(), None);
        reader.seek_to_start();
        assert_eq!(reader.read_nalu(), Some(AUD));
    }

    #[test]
    fn splits_on_parameter_sets_and_new_pictures() {
        let stream = annexb(&[SPS, PPS, IDR, P_SLICE, P_SLICE_CONT, P_SLICE, SPS, PPS, IDR]);
        let units: Vec<EncodedFrame> = AccessUnitSplitter::new(Bytes::from(stream)).collect();

        assert_eq!(units.len(), 4);
        assert!(units[0].is_keyframe);
        assert_eq!(units[0].data.as_ref(), annexb(&[SPS, PPS, IDR]).as_slice());
        assert!(!units[1].is_keyframe);
        assert_eq!(units[1].data.as_ref(), annexb(&[P_SLICE, P_SLICE_CONT]).as_slice());
        assert_eq!(units[2].data.as_ref(), annexb(&[P_SLICE]).as_slice());
        assert!(units[3].is_keyframe);

        let indices: Vec<u64> = units.iter().map(|u| u.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(units[2].timestamp_us, 2 * DEFAULT_FRAME_INTERVAL_US);
    }

    #[test]
    fn aud_always_opens_a_unit() {
        let stream = annexb(&[AUD, SPS, PPS, IDR, AUD, P_SLICE]);
        let units: Vec<EncodedFrame> = AccessUnitSplitter::new(Bytes::from(stream))
            .with_frame_interval_us(0)
            .collect();
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].data.as_ref(), annexb(&[AUD, P_SLICE]).as_slice());
        assert!(units.iter().all(|u| u.timestamp_us == 0));
    }

    #[test]
    fn empty_stream_has_no_units() {
        assert_eq!(AccessUnitSplitter::new(Bytes::new()).count(), 0);
    }
}
