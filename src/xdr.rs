use std::io::{self, Write};

/// Trait for values with a canonical XDR representation (RFC 4506).
/// careful: This is the wire format Horizon accepts; every field is big-endian
/// and padded to 4-byte boundaries.
pub trait XdrSerialize {
    fn write_xdr<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    fn to_xdr(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_xdr(&mut buf).expect("memory write failed");
        buf
    }
}

pub fn write_u32<W: Write>(writer: &mut W, v: u32) -> io::Result<()> {
    writer.write_all(&v.to_be_bytes())
}

pub fn write_u64<W: Write>(writer: &mut W, v: u64) -> io::Result<()> {
    writer.write_all(&v.to_be_bytes())
}

pub fn write_i64<W: Write>(writer: &mut W, v: i64) -> io::Result<()> {
    writer.write_all(&v.to_be_bytes())
}

/// Fixed-size opaque data, zero-filled up to `size`.
pub fn write_opaque_fixed<W: Write>(writer: &mut W, bytes: &[u8], size: usize) -> io::Result<()> {
    writer.write_all(bytes)?;
    for _ in bytes.len()..size {
        writer.write_all(&[0])?;
    }
    Ok(())
}

/// Variable-length opaque data: length prefix, bytes, zero padding to a
/// 4-byte boundary.
pub fn write_opaque_var<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_u32(writer, bytes.len() as u32)?;
    writer.write_all(bytes)?;
    let pad = (4 - bytes.len() % 4) % 4;
    for _ in 0..pad {
        writer.write_all(&[0])?;
    }
    Ok(())
}

pub fn write_string<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    write_opaque_var(writer, s.as_bytes())
}
