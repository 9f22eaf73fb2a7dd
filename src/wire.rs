use crate::error::AssetError;

/// Wire types of the protobuf binary encoding. Groups (types 3 and 4) are
/// long deprecated and never appear in the metadata container; they are
/// rejected rather than skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_tag_bits(bits: u64) -> Result<Self, AssetError> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(AssetError::WireFormat(format!(
                "unsupported wire type {other}"
            ))),
        }
    }
}

/// Cursor over a length-delimited protobuf buffer.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn read_varint(&mut self) -> Result<u64, AssetError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| AssetError::WireFormat("truncated varint".to_string()))?;
            self.pos += 1;
            if shift >= 64 {
                return Err(AssetError::WireFormat("varint overflow".to_string()));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Reads a field tag, returning the field number and wire type.
    pub fn read_tag(&mut self) -> Result<(u32, WireType), AssetError> {
        let tag = self.read_varint()?;
        let number = (tag >> 3) as u32;
        if number == 0 {
            return Err(AssetError::WireFormat("field number 0".to_string()));
        }
        Ok((number, WireType::from_tag_bits(tag & 0x7)?))
    }

    pub fn read_fixed32(&mut self) -> Result<u32, AssetError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, AssetError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Reads a length-delimited payload.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], AssetError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| AssetError::WireFormat("length out of range".to_string()))?;
        self.take(len)
    }

    /// Skips one value of the given wire type, used for field numbers the
    /// record type does not declare.
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), AssetError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::LengthDelimited => {
                self.read_bytes()?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AssetError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| AssetError::WireFormat("truncated field".to_string()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

pub fn decode_zigzag32(value: u64) -> i32 {
    let value = value as u32;
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub fn decode_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
