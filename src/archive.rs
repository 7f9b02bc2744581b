//! Container that carries the trained model next to the coded payload.
//!
//! ```text
//! [original length u32 LE][model length u32 LE][model][payload]
//! ```

use crate::cast;
use crate::error::{Error, Result};
use crate::models::wire::WireReader;

pub const HEADER_LEN: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archive {
    /// Number of symbols to decode
    pub original_len: u32,
    /// Serialized `ContextModel`
    pub model: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Archive {
    /// Size of `to_bytes` output
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.model.len() + self.payload.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let model_len = u32::try_from(self.model.len())
            .map_err(|_| Error::format("archive", "model larger than 4GiB"))?;
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.original_len.to_le_bytes());
        out.extend_from_slice(&model_len.to_le_bytes());
        out.extend_from_slice(&self.model);
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes, "archive");
        let original_len = reader.u32()?;
        let model_len = reader.u32()?;
        let model = reader
            .bytes(cast!(usize, model_len))
            .map_err(|_| reader.error(format!("model length {model_len} past end of input")))?
            .to_vec();
        let payload = reader.rest().to_vec();
        Ok(Self { original_len, model, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::Archive;

    #[test]
    fn layout() {
        let archive = Archive { original_len: 3, model: b"MOD".to_vec(), payload: vec![0xaa] };
        let bytes = archive.to_bytes().unwrap();
        assert_eq!(bytes, b"\x03\x00\x00\x00\x03\x00\x00\x00MOD\xaa");
        assert_eq!(bytes.len(), archive.encoded_len());
        assert_eq!(Archive::from_bytes(&bytes).unwrap(), archive);
    }

    #[test]
    fn empty_payload() {
        let archive = Archive::from_bytes(b"\x00\x00\x00\x00\x01\x00\x00\x00M").unwrap();
        assert_eq!(archive.model, b"M");
        assert!(archive.payload.is_empty());
    }

    #[test]
    fn rejects_short_input() {
        assert!(Archive::from_bytes(b"").is_err());
        assert!(Archive::from_bytes(b"\x01\x00\x00\x00\x00\x00\x00").is_err());
        let err = Archive::from_bytes(b"\x01\x00\x00\x00\x09\x00\x00\x00abc").unwrap_err();
        assert_eq!(err.to_string(), "malformed archive: model length 9 past end of input");
    }
}
