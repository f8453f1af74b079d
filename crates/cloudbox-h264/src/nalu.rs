pub const ANNEX_B_START_CODE: [u8; 4] = [0, 0, 0, 1];

const SHORT_START_CODE_LEN: usize = 3;

// MARK: - NaluType

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NaluType {
    Slice,
    Idr,
    Sei,
    Sps,
    Pps,
    Aud,
    Other(u8),
}

impl NaluType {
    /// Type from the first byte of a NAL unit (the header).
    pub fn from_header(header: u8) -> Self {
        match header & 0x1F {
            1 => Self::Slice,
            5 => Self::Idr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            other => Self::Other(other),
        }
    }

    /// Coded slice data (types 1-5).
    pub fn is_vcl(&self) -> bool {
        match self {
            Self::Slice | Self::Idr => true,
            Self::Other(t) => (2..=4).contains(t),
            _ => false,
        }
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, Self::Sps | Self::Pps)
    }
}

// MARK: - NaluIndex

/// Location of one NAL unit inside an Annex B buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaluIndex {
    /// Offset of the start code (including the leading zero of a 4-byte code).
    pub start_offset: usize,
    /// Offset of the NAL header byte.
    pub payload_start_offset: usize,
    pub payload_size: usize,
}

impl NaluIndex {
    pub fn payload<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.payload_start_offset..self.payload_start_offset + self.payload_size]
    }

    pub fn nalu_type(&self, buffer: &[u8]) -> Option<NaluType> {
        self.payload(buffer).first().map(|b| NaluType::from_header(*b))
    }

    pub fn start_code_len(&self) -> usize {
        self.payload_start_offset - self.start_offset
    }
}

/// Scans `buffer` for start codes and returns every NAL unit found.
///
/// A start code sitting in the last three bytes is not reported, and each
/// NAL unit extends up to the next start code (or the end of the buffer).
pub fn find_nalu_indices(buffer: &[u8]) -> Vec<NaluIndex> {
    let mut sequences: Vec<NaluIndex> = Vec::new();
    if buffer.len() < SHORT_START_CODE_LEN {
        return sequences;
    }

    let end = buffer.len() - SHORT_START_CODE_LEN;
    let mut i = 0;
    while i < end {
        if buffer[i + 2] > 1 {
            i += 3;
        } else if buffer[i + 2] == 1 {
            if buffer[i + 1] == 0 && buffer[i] == 0 {
                let mut index = NaluIndex {
                    start_offset: i,
                    payload_start_offset: i + 3,
                    payload_size: 0,
                };
                if index.start_offset > 0 && buffer[index.start_offset - 1] == 0 {
                    index.start_offset -= 1;
                }
                if let Some(prev) = sequences.last_mut() {
                    prev.payload_size = index.start_offset - prev.payload_start_offset;
                }
                sequences.push(index);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    if let Some(last) = sequences.last_mut() {
        last.payload_size = buffer.len() - last.payload_start_offset;
    }
    sequences
}

/// True if `buffer` contains at least one Annex B start code.
pub fn has_start_code(buffer: &[u8]) -> bool {
    !find_nalu_indices(buffer).is_empty()
}

/// Types of every NAL unit in `buffer`, in stream order.
pub fn nalu_types(buffer: &[u8]) -> Vec<NaluType> {
    find_nalu_indices(buffer)
        .iter()
        .filter_map(|index| index.nalu_type(buffer))
        .collect()
}
