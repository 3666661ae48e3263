//! Little-endian primitive readers and writers shared by both formats.

use std::io::{Read, Write};

use crate::error::CodecError;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CodecError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f32 (bit pattern preserved).
pub fn write_f32_le(w: &mut dyn Write, v: f32) -> Result<(), CodecError> {
    w.write_all(&v.to_bits().to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64 (bit pattern preserved).
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CodecError> {
    w.write_all(&v.to_bits().to_le_bytes())?;
    Ok(())
}

/// Write a `usize` count as u32, failing when it does not fit.
pub fn write_count(w: &mut dyn Write, n: usize, what: &str) -> Result<(), CodecError> {
    let v = u32::try_from(n).map_err(|_| CodecError::Serialization {
        detail: format!("{what} {n} exceeds u32::MAX"),
    })?;
    write_u32_le(w, v)
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, CodecError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, CodecError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, CodecError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian f32.
pub fn read_f32_le(r: &mut dyn Read) -> Result<f32, CodecError> {
    Ok(f32::from_bits(read_u32_le(r)?))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, CodecError> {
    Ok(f64::from_bits(read_u64_le(r)?))
}

/// Read and check a 4-byte magic and a 1-byte version.
pub fn read_header(r: &mut dyn Read, magic: [u8; 4], version: u8) -> Result<(), CodecError> {
    let mut found = [0u8; 4];
    r.read_exact(&mut found)?;
    if found != magic {
        return Err(CodecError::InvalidMagic {
            expected: magic,
            found,
        });
    }
    let v = read_u8(r)?;
    if v != version {
        return Err(CodecError::UnsupportedVersion { found: v });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_their_bits() {
        let mut buf = Vec::new();
        let nan = f32::from_bits(0x7fc0_1234);
        write_f32_le(&mut buf, nan).unwrap();
        write_f64_le(&mut buf, -0.0).unwrap();
        let mut r: &[u8] = &buf;
        assert_eq!(read_f32_le(&mut r).unwrap().to_bits(), 0x7fc0_1234);
        assert_eq!(read_f64_le(&mut r).unwrap().to_bits(), (-0.0f64).to_bits());
    }

    #[test]
    fn header_rejects_wrong_magic_and_version() {
        let mut r: &[u8] = b"NOPE\x01";
        assert!(matches!(
            read_header(&mut r, *b"CM5S", 1),
            Err(CodecError::InvalidMagic { .. })
        ));
        let mut r: &[u8] = b"CM5S\x09";
        assert!(matches!(
            read_header(&mut r, *b"CM5S", 1),
            Err(CodecError::UnsupportedVersion { found: 9 })
        ));
    }

    #[test]
    fn truncated_input_is_an_eof_error() {
        let mut r: &[u8] = &[1, 2];
        let err = read_u32_le(&mut r).unwrap_err();
        assert_eq!(err.class(), crate::CodecErrorClass::Serialization);
    }
}
