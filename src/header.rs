use crate::error::SessionError;

/// Length of the fixed FLV file header prefix.
pub const HEADER_LEN: usize = 9;

/// Signature every FLV stream starts with.
pub const FLV_SIGNATURE: &[u8; 3] = b"FLV";

/// Fields decoded from the 9-byte FLV prefix.
///
/// Only the signature is checked. Version, flags and header size are kept for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvHeader {
    pub signature: [u8; 3],
    pub version: u8,
    pub flags: u8,
    pub header_size: u32,
}

impl FlvHeader {
    /// Decodes the prefix without judging the signature.
    pub fn parse(data: &[u8]) -> Result<Self, SessionError> {
        if data.len() < HEADER_LEN {
            return Err(SessionError::MalformedHeader(format!(
                "header too short: {} bytes",
                data.len()
            )));
        }

        Ok(Self {
            signature: [data[0], data[1], data[2]],
            version: data[3],
            flags: data[4],
            header_size: u32::from_be_bytes([data[5], data[6], data[7], data[8]]),
        })
    }

    pub fn has_valid_signature(&self) -> bool {
        &self.signature == FLV_SIGNATURE
    }

    pub fn has_audio(&self) -> bool {
        self.flags & 0x04 != 0
    }

    pub fn has_video(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

/// Returns whether `data` starts with a valid FLV header.
///
/// Fails with [`SessionError::MalformedHeader`] when fewer than
/// [`HEADER_LEN`] bytes are supplied.
pub fn validate_header(data: &[u8]) -> Result<bool, SessionError> {
    let header = FlvHeader::parse(data)?;
    if !header.has_valid_signature() {
        tracing::debug!(
            "invalid FLV signature: {}",
            String::from_utf8_lossy(&header.signature)
        );
        return Ok(false);
    }

    tracing::debug!(
        version = header.version,
        flags = header.flags,
        header_size = header.header_size,
        audio = header.has_audio(),
        video = header.has_video(),
        "FLV header"
    );
    Ok(true)
}
