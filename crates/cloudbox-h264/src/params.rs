use bytes::{BufMut, Bytes, BytesMut};
use cloudbox_core::BitstreamError;

use crate::annexb::AnnexBReader;
use crate::avcc::AVCC_HEADER_SIZE;
use crate::nalu::NaluType;

// MARK: - ParameterSets

/// The SPS/PPS pair a decoder needs before the first slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSets {
    pub sps: Bytes,
    pub pps: Bytes,
}

impl ParameterSets {
    /// First SPS in `annexb` and the first PPS after it.
    pub fn from_annexb(annexb: &[u8]) -> Result<Self, BitstreamError> {
        let mut reader = AnnexBReader::new(annexb);
        if !reader.seek_to_next_nalu_of_type(NaluType::Sps) {
            return Err(BitstreamError::MissingParameterSets);
        }
        let sps = reader.read_nalu().ok_or(BitstreamError::MissingParameterSets)?;
        if !reader.seek_to_next_nalu_of_type(NaluType::Pps) {
            return Err(BitstreamError::MissingParameterSets);
        }
        let pps = reader.read_nalu().ok_or(BitstreamError::MissingParameterSets)?;
        Ok(Self { sps: Bytes::copy_from_slice(sps), pps: Bytes::copy_from_slice(pps) })
    }

    /// Parameter sets in effect after `annexb`: an SPS or PPS found in the
    /// unit replaces the matching one of `current`, the other is kept.
    pub fn update(current: Option<&Self>, annexb: &[u8]) -> Result<Self, BitstreamError> {
        let mut reader = AnnexBReader::new(annexb);
        let (mut sps, mut pps) = (None, None);
        while let Some(nalu) = reader.read_nalu() {
            match nalu.first().map(|&header| NaluType::from_header(header)) {
                Some(NaluType::Sps) if sps.is_none() => sps = Some(Bytes::copy_from_slice(nalu)),
                Some(NaluType::Pps) if pps.is_none() => pps = Some(Bytes::copy_from_slice(nalu)),
                _ => {}
            }
        }
        let sps = sps.or_else(|| current.map(|c| c.sps.clone()));
        let pps = pps.or_else(|| current.map(|c| c.pps.clone()));
        match (sps, pps) {
            (Some(sps), Some(pps)) => Ok(Self { sps, pps }),
            _ => Err(BitstreamError::MissingParameterSets),
        }
    }
}

// MARK: - FormatDescription

/// Stream format derived from a parameter-set pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    pub parameter_sets: ParameterSets,
    pub profile_idc: u8,
    pub profile_compatibility: u8,
    pub level_idc: u8,
}

impl FormatDescription {
    pub fn from_parameter_sets(parameter_sets: ParameterSets) -> Result<Self, BitstreamError> {
        let sps = &parameter_sets.sps;
        if sps.len() < 4 {
            return Err(BitstreamError::Truncated { reason: format!("SPS is {} bytes", sps.len()) });
        }
        if parameter_sets.pps.is_empty() {
            return Err(BitstreamError::Truncated { reason: "PPS is empty".into() });
        }
        let (profile_idc, profile_compatibility, level_idc) = (sps[1], sps[2], sps[3]);
        Ok(Self { parameter_sets, profile_idc, profile_compatibility, level_idc })
    }

    pub fn from_annexb(annexb: &[u8]) -> Result<Self, BitstreamError> {
        Self::from_parameter_sets(ParameterSets::from_annexb(annexb)?)
    }

    pub fn nal_length_size(&self) -> usize {
        AVCC_HEADER_SIZE
    }

    /// RFC 6381 codec string, e.g. `avc1.64001f`.
    pub fn codec_string(&self) -> String {
        format!("avc1.{:02x}{:02x}{:02x}", self.profile_idc, self.profile_compatibility, self.level_idc)
    }

    /// `AVCDecoderConfigurationRecord` (ISO/IEC 14496-15) with one SPS and one PPS.
    pub fn decoder_config_record(&self) -> Bytes {
        let ParameterSets { sps, pps } = &self.parameter_sets;
        let mut out = BytesMut::with_capacity(11 + sps.len() + pps.len());
        out.put_u8(1);
        out.put_u8(self.profile_idc);
        out.put_u8(self.profile_compatibility);
        out.put_u8(self.level_idc);
        out.put_u8(0xFC | (self.nal_length_size() as u8 - 1));
        out.put_u8(0xE0 | 1);
        out.put_u16(sps.len() as u16);
        out.put_slice(sps);
        out.put_u8(1);
        out.put_u16(pps.len() as u16);
        out.put_slice(pps);
        out.freeze()
    }
}
