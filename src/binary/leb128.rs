use super::error::{DecodeError, Res, fail};

/// The maximum length of a leb128-encoded 32-bit integer
pub const MAX_LEB128_LEN_32: usize = 5;
pub const MAX_LEB128_LEN_64: usize = 10;

/// Decodes an unsigned 32-bit LEB128 integer, returning the value and the
/// number of bytes it occupied.
///
/// The fifth byte may only carry the four bits left over from the first 28,
/// so a fifth byte above `0x0f` (which includes any continuation bit) is an
/// overflow.
pub fn decode_unsigned(input: &[u8]) -> Res<'_, (u32, usize)> {
    let mut value = 0u32;

    for (i, &byte) in input.iter().enumerate() {
        if i == MAX_LEB128_LEN_32 - 1 && byte > 0x0f {
            return fail(DecodeError::Overflow);
        }

        value |= ((byte & 0x7f) as u32) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((&input[i + 1..], (value, i + 1)));
        }
    }

    fail(DecodeError::UnexpectedEnd)
}

/// Decodes a signed 64-bit LEB128 integer, sign-extending from bit 6 of the
/// final group.
pub fn decode_signed(input: &[u8]) -> Res<'_, (i64, usize)> {
    let mut value = 0i64;

    for (i, &byte) in input.iter().enumerate() {
        // only bit 63 is left for the tenth byte, the rest must repeat the sign
        if i == MAX_LEB128_LEN_64 - 1 && byte != 0x00 && byte != 0x7f {
            return fail(DecodeError::Overflow);
        }

        let shift = 7 * i as u32;
        value |= ((byte & 0x7f) as i64) << shift;

        if byte & 0x80 == 0 {
            let shift = shift + 7;
            if shift < 64 && byte & 0x40 != 0 {
                value |= -1i64 << shift;
            }
            return Ok((&input[i + 1..], (value, i + 1)));
        }
    }

    fail(DecodeError::UnexpectedEnd)
}

pub fn var_u32(input: &[u8]) -> Res<'_, u32> {
    let (rest, (value, _)) = decode_unsigned(input)?;
    Ok((rest, value))
}

pub fn var_u7(input: &[u8]) -> Res<'_, u8> {
    let (rest, (value, len)) = decode_unsigned(input)?;
    if len != 1 {
        return fail(DecodeError::MalformedEncoding {
            width: "varuint7",
            len,
        });
    }
    Ok((rest, value as u8))
}

pub fn var_u1(input: &[u8]) -> Res<'_, bool> {
    let (rest, value) = var_u7(input)?;
    match value {
        0 => Ok((rest, false)),
        1 => Ok((rest, true)),
        _ => fail(DecodeError::Overflow),
    }
}

pub fn var_i7(input: &[u8]) -> Res<'_, i8> {
    let (rest, (value, len)) = decode_signed(input)?;
    if len != 1 {
        return fail(DecodeError::MalformedEncoding {
            width: "varint7",
            len,
        });
    }
    // a single group always lands in -64..=63
    Ok((rest, value as i8))
}

pub fn var_i32(input: &[u8]) -> Res<'_, i32> {
    let (rest, (value, len)) = decode_signed(input)?;
    if len > MAX_LEB128_LEN_32 {
        return fail(DecodeError::MalformedEncoding {
            width: "varint32",
            len,
        });
    }
    match i32::try_from(value) {
        Ok(value) => Ok((rest, value)),
        Err(_) => fail(DecodeError::Overflow),
    }
}

pub fn var_i64(input: &[u8]) -> Res<'_, i64> {
    let (rest, (value, _)) = decode_signed(input)?;
    Ok((rest, value))
}

/// Appends the canonical (shortest) encoding of `value` and returns the
/// number of bytes written.
pub fn write_u32(buf: &mut Vec<u8>, mut value: u32) -> usize {
    let start = buf.len();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
    buf.len() - start
}

pub fn encode_unsigned32(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_LEB128_LEN_32);
    write_u32(&mut buf, value);
    buf
}
