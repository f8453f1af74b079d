//! cloudbox-h264: H.264 bitstream plumbing for the client backends.
//!
//! Sources arrive as Annex B byte streams (`00 00 01` / `00 00 00 01` start
//! codes). Sample-based decoders want AVCC instead: every NAL unit prefixed
//! by its 4-byte big-endian length, parameter sets carried out of band.
//!
//! # Flow
//! ```text
//! file / frame bytes
//!   │  find_nalu_indices
//!   ▼
//! AccessUnitSplitter ──► EncodedFrame (Annex B, one picture)
//!   │                          │ ParameterSets::from_annexb
//!   │                          ▼
//!   │                    FormatDescription (SPS, PPS, avcC record)
//!   ▼
//! annexb_to_avcc / rewrite_single_nalu_in_place ──► AvccSample
//! ```
//!
//! Nothing here decodes pixels.

pub mod annexb;
pub mod avcc;
pub mod nalu;
pub mod params;

pub use annexb::{AccessUnitSplitter, AnnexBReader, DEFAULT_FRAME_INTERVAL_US};
pub use avcc::{
    annexb_to_avcc, is_single_nalu, rewrite_single_nalu_in_place, AvccSample, AvccWriter, AVCC_HEADER_SIZE,
};
pub use nalu::{find_nalu_indices, has_start_code, nalu_types, NaluIndex, NaluType, ANNEX_B_START_CODE};
pub use params::{FormatDescription, ParameterSets};
