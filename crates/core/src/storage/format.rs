use crate::errors::CoreError;

use super::encryption::{KdfParams, SealedRecord};

/// Magic bytes identifying a ledger record.
pub const MAGIC: &[u8; 4] = b"FLDG";

/// Current record format version.
pub const CURRENT_VERSION: u16 = 1;

const MODE_PLAIN: u8 = 0;
const MODE_SEALED: u8 = 1;

/// Decoded record body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    /// bincode-encoded ledger, unencrypted
    Plain(Vec<u8>),
    /// bincode-encoded ledger sealed with the store passphrase
    Sealed(SealedRecord),
}

/// Frame a record body.
///
/// Layout:
/// ```text
/// [FLDG: 4B] [version: 2B LE] [mode: 1B]
/// mode 1 only: [memory_cost: 4B LE] [time_cost: 4B LE] [parallelism: 4B LE]
///              [salt: 16B] [nonce: 12B]
/// [payload_len: 8B LE] [payload]
/// ```
pub fn write_record(body: &RecordBody) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&CURRENT_VERSION.to_le_bytes());

    let payload = match body {
        RecordBody::Plain(bytes) => {
            buf.push(MODE_PLAIN);
            bytes
        }
        RecordBody::Sealed(sealed) => {
            buf.push(MODE_SEALED);
            buf.extend_from_slice(&sealed.kdf.memory_cost.to_le_bytes());
            buf.extend_from_slice(&sealed.kdf.time_cost.to_le_bytes());
            buf.extend_from_slice(&sealed.kdf.parallelism.to_le_bytes());
            buf.extend_from_slice(&sealed.salt);
            buf.extend_from_slice(&sealed.nonce);
            &sealed.ciphertext
        }
    };

    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Parse a framed record. Trailing bytes after the payload are ignored.
pub fn read_record(data: &[u8]) -> Result<RecordBody, CoreError> {
    let mut reader = Reader { data, pos: 0 };

    if reader.take(4)? != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes, not a ledger record".into(),
        ));
    }

    let version = u16::from_le_bytes(reader.array()?);
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let mode = reader.take(1)?[0];
    let sealed_header = match mode {
        MODE_PLAIN => None,
        MODE_SEALED => {
            let kdf = KdfParams {
                memory_cost: u32::from_le_bytes(reader.array()?),
                time_cost: u32::from_le_bytes(reader.array()?),
                parallelism: u32::from_le_bytes(reader.array()?),
            };
            kdf.check().map_err(CoreError::InvalidFileFormat)?;
            let salt: [u8; 16] = reader.array()?;
            let nonce: [u8; 12] = reader.array()?;
            Some((kdf, salt, nonce))
        }
        other => {
            return Err(CoreError::InvalidFileFormat(format!(
                "Unknown record mode {other}"
            )))
        }
    };

    let len = u64::from_le_bytes(reader.array()?);
    let len = usize::try_from(len).map_err(|_| {
        CoreError::InvalidFileFormat(format!("Payload length {len} does not fit in memory"))
    })?;
    let payload = reader.take(len)?.to_vec();

    Ok(match sealed_header {
        None => RecordBody::Plain(payload),
        Some((kdf, salt, nonce)) => RecordBody::Sealed(SealedRecord {
            kdf,
            salt,
            nonce,
            ciphertext: payload,
        }),
    })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                CoreError::InvalidFileFormat(format!(
                    "Record truncated: needed {n} bytes at offset {}, {} available",
                    self.pos,
                    self.data.len().saturating_sub(self.pos)
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
