//! Byte-level encoding of the structures in [`crate::spec`].

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order used for a path table copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
  /// Type L path table.
  Little,
  /// Type M path table.
  Big,
}

pub trait IsoSerialize {
  /// Additional state needed to serialize the type, e.g. [`Endianness`].
  type Context;

  /// Serialized size in bytes.
  fn extent(&self) -> usize;

  /// Writes the structure to the start of `out`, which must hold at least
  /// [`IsoSerialize::extent`] bytes.
  fn serialize(&self, context: &mut Self::Context, out: &mut [u8]) -> std::io::Result<()>;
}

pub(crate) fn ensure_len(out: &[u8], needed: usize) -> std::io::Result<()> {
  if out.len() < needed {
    return Err(std::io::Error::new(
      std::io::ErrorKind::InvalidInput,
      format!("buffer of {} bytes cannot hold {} bytes", out.len(), needed),
    ));
  }

  Ok(())
}

/// 16-bit value recorded in both byte orders (ISO 9660 7.2.3).
pub(crate) fn write_both_u16(out: &mut [u8], value: u16) {
  LittleEndian::write_u16(&mut out[0..2], value);
  BigEndian::write_u16(&mut out[2..4], value);
}

/// 32-bit value recorded in both byte orders (ISO 9660 7.3.3).
pub(crate) fn write_both_u32(out: &mut [u8], value: u32) {
  LittleEndian::write_u32(&mut out[0..4], value);
  BigEndian::write_u32(&mut out[4..8], value);
}

pub(crate) fn write_u16(endianness: Endianness, out: &mut [u8], value: u16) {
  match endianness {
    Endianness::Little => LittleEndian::write_u16(out, value),
    Endianness::Big => BigEndian::write_u16(out, value),
  }
}

pub(crate) fn write_u32(endianness: Endianness, out: &mut [u8], value: u32) {
  match endianness {
    Endianness::Little => LittleEndian::write_u32(out, value),
    Endianness::Big => BigEndian::write_u32(out, value),
  }
}

/// Copies `text` into `out`, filling the remainder with `fill`.
pub(crate) fn write_padded(out: &mut [u8], text: &[u8], fill: &[u8]) {
  let len = text.len().min(out.len());
  out[..len].copy_from_slice(&text[..len]);

  for (ix, byte) in out[len..].iter_mut().enumerate() {
    *byte = fill[(len + ix) % fill.len()];
  }
}
