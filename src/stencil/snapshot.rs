//! Versioned flat binary encoding of a mask, used for undo history and for
//! parking released layers.
//!
//! Layout, all integers little-endian:
//!
//! | field      | type      |                                   |
//! |------------|-----------|-----------------------------------|
//! | magic      | `[u8; 4]` | `b"LBSM"`                         |
//! | version    | `u16`     | currently 1                       |
//! | encoding   | `u8`      | 0 raw, 1 zlib                     |
//! | resolution | `u32`     | side length                       |
//! | length     | `u32`     | payload byte count                |
//! | payload    | bytes     | `resolution²` `u16`s, maybe zlib  |

use crate::stencil::error::StencilError;
use crate::stencil::mask::{Mask, MaskResolution};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Cursor, Read, Write};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"LBSM";
pub const SNAPSHOT_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 1 + 4 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotEncoding {
    Raw = 0,
    Zlib = 1,
}

impl SnapshotEncoding {
    fn from_byte(byte: u8) -> Result<Self, StencilError> {
        match byte {
            0 => Ok(SnapshotEncoding::Raw),
            1 => Ok(SnapshotEncoding::Zlib),
            other => Err(StencilError::Snapshot(format!("unknown encoding {other}"))),
        }
    }
}

/// Encoded mask bytes plus the resolution, so callers can report memory use
/// without decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSnapshot {
    resolution: MaskResolution,
    bytes: Vec<u8>,
}

impl MaskSnapshot {
    pub fn capture(mask: &Mask, encoding: SnapshotEncoding) -> Result<Self, StencilError> {
        Ok(Self {
            resolution: mask.resolution(),
            bytes: encode(mask, encoding)?,
        })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, StencilError> {
        let header = read_header(&bytes)?;
        Ok(Self {
            resolution: header.resolution,
            bytes,
        })
    }

    pub fn restore(&self) -> Result<Mask, StencilError> {
        decode(&self.bytes)
    }

    pub fn resolution(&self) -> MaskResolution {
        self.resolution
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }
}

fn raw_payload(mask: &Mask) -> Vec<u8> {
    let mut payload = Vec::with_capacity(mask.byte_size());
    for &value in mask.cells() {
        payload.extend_from_slice(&value.to_le_bytes());
    }
    payload
}

fn snapshot_io(err: std::io::Error) -> StencilError {
    StencilError::Snapshot(err.to_string())
}

pub fn encode(mask: &Mask, encoding: SnapshotEncoding) -> Result<Vec<u8>, StencilError> {
    let raw = raw_payload(mask);
    let payload = match encoding {
        SnapshotEncoding::Raw => raw,
        SnapshotEncoding::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
            encoder.write_all(&raw).map_err(snapshot_io)?;
            encoder.finish().map_err(snapshot_io)?
        }
    };
    let length = u32::try_from(payload.len())
        .map_err(|_| StencilError::Snapshot("payload exceeds 4 GiB".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.write_all(&SNAPSHOT_MAGIC).map_err(snapshot_io)?;
    out.write_u16::<LittleEndian>(SNAPSHOT_VERSION)
        .map_err(snapshot_io)?;
    out.write_u8(encoding as u8).map_err(snapshot_io)?;
    out.write_u32::<LittleEndian>(mask.side() as u32)
        .map_err(snapshot_io)?;
    out.write_u32::<LittleEndian>(length).map_err(snapshot_io)?;
    out.extend_from_slice(&payload);
    Ok(out)
}

struct Header {
    encoding: SnapshotEncoding,
    resolution: MaskResolution,
    length: usize,
}

fn read_header(bytes: &[u8]) -> Result<Header, StencilError> {
    if bytes.len() < HEADER_LEN {
        return Err(StencilError::Snapshot(format!(
            "{} bytes is shorter than the header",
            bytes.len()
        )));
    }
    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic).map_err(snapshot_io)?;
    if magic != SNAPSHOT_MAGIC {
        return Err(StencilError::Snapshot("bad magic".into()));
    }
    let version = cursor.read_u16::<LittleEndian>().map_err(snapshot_io)?;
    if version != SNAPSHOT_VERSION {
        return Err(StencilError::Snapshot(format!(
            "unsupported version {version}"
        )));
    }
    let encoding = SnapshotEncoding::from_byte(cursor.read_u8().map_err(snapshot_io)?)?;
    let side = cursor.read_u32::<LittleEndian>().map_err(snapshot_io)?;
    let resolution = MaskResolution::try_from(side)
        .map_err(|_| StencilError::Snapshot(format!("unsupported resolution {side}")))?;
    let length = cursor.read_u32::<LittleEndian>().map_err(snapshot_io)? as usize;
    if bytes.len() - HEADER_LEN != length {
        return Err(StencilError::Snapshot(format!(
            "header declares {length} payload bytes, found {}",
            bytes.len() - HEADER_LEN
        )));
    }
    Ok(Header {
        encoding,
        resolution,
        length,
    })
}

pub fn decode(bytes: &[u8]) -> Result<Mask, StencilError> {
    let header = read_header(bytes)?;
    let payload = &bytes[HEADER_LEN..HEADER_LEN + header.length];
    let expected = header.resolution.cells() * 2;

    let raw = match header.encoding {
        SnapshotEncoding::Raw => payload.to_vec(),
        SnapshotEncoding::Zlib => {
            let mut raw = Vec::with_capacity(expected);
            ZlibDecoder::new(payload)
                .take(expected as u64 + 1)
                .read_to_end(&mut raw)
                .map_err(snapshot_io)?;
            raw
        }
    };
    if raw.len() != expected {
        return Err(StencilError::Snapshot(format!(
            "payload holds {} bytes, a {} mask needs {expected}",
            raw.len(),
            header.resolution
        )));
    }

    let mut cells = vec![0u16; header.resolution.cells()];
    Cursor::new(raw)
        .read_u16_into::<LittleEndian>(&mut cells)
        .map_err(snapshot_io)?;
    Mask::from_cells(header.resolution, cells)
}
