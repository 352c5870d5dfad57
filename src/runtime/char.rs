//! Characters.
//!
//! A char block stores the UTF-8 encoding of one scalar value in a `u32`,
//! first byte lowest; bytes past the encoded width are zero.

use super::{
    error::RuntimeError,
    factory::make_byte_block,
    heap,
    object::{expect_block, BlockRef, HeapKind, CHAR_SIZE, CHAR_UTF8_OFFSET},
    value::{Value, Word},
};
use crate::RtResult;

pub const MAX_SCALAR: u32 = 0x10ffff;

/// Whether `scalar` is a Unicode scalar value.
pub fn is_valid(scalar: i64) -> bool {
    (0..=0xd7ff).contains(&scalar) || (0xe000..=MAX_SCALAR as i64).contains(&scalar)
}

/// Encoded width implied by a leading byte.
#[inline]
pub const fn utf8_width(leading: u8) -> usize {
    if leading < 0x80 {
        1
    } else if leading < 0xe0 {
        2
    } else if leading < 0xf0 {
        3
    } else {
        4
    }
}

/// The stored UTF-8 word with bytes past the encoded width cleared.
#[inline]
pub(crate) fn masked_utf8(block: BlockRef) -> u32 {
    let word = block.u32_at(CHAR_UTF8_OFFSET);
    match utf8_width(word as u8) {
        4 => word,
        width => word & ((1 << (8 * width)) - 1),
    }
}

pub fn make_char(c: char) -> Value {
    let mut buf = [0u8; 4];
    c.encode_utf8(&mut buf);
    let block = heap::allocate(HeapKind::Char, CHAR_SIZE);
    block.set_u32_at(CHAR_UTF8_OFFSET, u32::from_le_bytes(buf));
    unsafe { Value::from_word(Word::from_block(block)) }
}

pub fn char_from_code(scalar: i64) -> RtResult<Value> {
    u32::try_from(scalar)
        .ok()
        .and_then(char::from_u32)
        .map(make_char)
        .ok_or_else(|| {
            RuntimeError::invalid_argument(format!("{:#x} is not a Unicode scalar value", scalar))
        })
}

fn continuation(byte: u8, lo: u8, hi: u8) -> RtResult<u32> {
    if (lo..=hi).contains(&byte) {
        Ok((byte & 0x3f) as u32)
    } else {
        Err(RuntimeError::malformed(format!(
            "continuation byte {:#04x} outside {:#04x}..={:#04x}",
            byte, lo, hi
        )))
    }
}

/// Decodes a stored UTF-8 word.
pub fn decode_utf8(word: u32) -> RtResult<u32> {
    let [b0, b1, b2, b3] = word.to_le_bytes();
    match b0 {
        0x00..=0x7f => Ok(b0 as u32),
        0xc2..=0xdf => Ok(((b0 & 0x1f) as u32) << 6 | continuation(b1, 0x80, 0xbf)?),
        0xe0..=0xef => {
            let (lo, hi) = match b0 {
                0xe0 => (0xa0, 0xbf),
                0xed => (0x80, 0x9f),
                _ => (0x80, 0xbf),
            };
            Ok(((b0 & 0x0f) as u32) << 12
                | continuation(b1, lo, hi)? << 6
                | continuation(b2, 0x80, 0xbf)?)
        }
        0xf0..=0xf4 => {
            let (lo, hi) = match b0 {
                0xf0 => (0x90, 0xbf),
                0xf4 => (0x80, 0x8f),
                _ => (0x80, 0xbf),
            };
            Ok(((b0 & 0x07) as u32) << 18
                | continuation(b1, lo, hi)? << 12
                | continuation(b2, 0x80, 0xbf)? << 6
                | continuation(b3, 0x80, 0xbf)?)
        }
        _ => Err(RuntimeError::malformed(format!("invalid leading byte {:#04x}", b0))),
    }
}

/// The scalar value of a char.
pub fn char_code(c: &Value) -> RtResult<u32> {
    decode_utf8(expect_block(c, HeapKind::Char)?.u32_at(CHAR_UTF8_OFFSET))
}

pub fn char_to_char(c: &Value) -> RtResult<char> {
    let code = char_code(c)?;
    char::from_u32(code)
        .ok_or_else(|| RuntimeError::malformed(format!("{:#x} is not a Unicode scalar value", code)))
}

/// A one-character string.
pub fn char_to_string(c: &Value) -> RtResult<Value> {
    let mut buf = [0u8; 4];
    let s = char_to_char(c)?.encode_utf8(&mut buf);
    Ok(make_byte_block(HeapKind::String, s.as_bytes()))
}

/// The next scalar value, skipping the surrogate gap.
pub fn char_succ(c: &Value) -> RtResult<Value> {
    match char_code(c)? {
        MAX_SCALAR => Err(RuntimeError::invalid_argument("no scalar value after U+10FFFF")),
        0xd7ff => char_from_code(0xe000),
        code => char_from_code(code as i64 + 1),
    }
}

/// The previous scalar value, skipping the surrogate gap.
pub fn char_pred(c: &Value) -> RtResult<Value> {
    match char_code(c)? {
        0 => Err(RuntimeError::invalid_argument("no scalar value before U+0000")),
        0xe000 => char_from_code(0xd7ff),
        code => char_from_code(code as i64 - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::string::string_as_str;

    fn stored(c: &Value) -> u32 {
        c.word().block().u32_at(CHAR_UTF8_OFFSET)
    }

    #[test]
    fn validity() {
        assert!(is_valid(0));
        assert!(is_valid(0xd7ff));
        assert!(!is_valid(0xd800));
        assert!(!is_valid(0xdfff));
        assert!(is_valid(0xe000));
        assert!(is_valid(0x10ffff));
        assert!(!is_valid(0x110000));
        assert!(!is_valid(-1));
    }

    #[test]
    fn every_scalar_round_trips() {
        for code in (0..=0xd7ff).chain(0xe000..=MAX_SCALAR) {
            let c = char_from_code(code as i64).unwrap();
            assert_eq!(char_code(&c), Ok(code));
        }
    }

    #[test]
    fn storage_is_utf8_first_byte_lowest() {
        assert_eq!(stored(&make_char('A')), 0x41);
        assert_eq!(stored(&make_char('é')), 0xa9c3);
        assert_eq!(stored(&make_char('€')), 0xac82e2);
        assert_eq!(stored(&make_char('😀')), 0x8098_9ff0);
    }

    #[test]
    fn surrogates_are_rejected() {
        assert!(matches!(char_from_code(0xd800), Err(RuntimeError::InvalidArgument(_))));
        assert!(char_from_code(0x110000).is_err());
        assert!(char_from_code(-5).is_err());
    }

    #[test]
    fn succ_and_pred_skip_the_gap() {
        let c = char_from_code(0xd7ff).unwrap();
        assert_eq!(char_code(&char_succ(&c).unwrap()), Ok(0xe000));
        let c = char_from_code(0xe000).unwrap();
        assert_eq!(char_code(&char_pred(&c).unwrap()), Ok(0xd7ff));
        assert!(char_succ(&char_from_code(0x10ffff).unwrap()).is_err());
        assert!(char_pred(&char_from_code(0).unwrap()).is_err());
        assert_eq!(char_to_char(&char_succ(&make_char('a')).unwrap()), Ok('b'));
    }

    #[test]
    fn malformed_sequences() {
        // Overlong, surrogate and out-of-range encodings.
        assert!(matches!(decode_utf8(0x80e0), Err(RuntimeError::MalformedUtf8(_))));
        assert!(decode_utf8(0xa0ed).is_err());
        assert!(decode_utf8(0x8080_80f0).is_err());
        assert!(decode_utf8(0x8080_90f4).is_err());
        assert!(decode_utf8(0x41c3).is_err());
        assert!(decode_utf8(0xc0).is_err());
        assert_eq!(decode_utf8(0x8080_90f0), Ok(0x10000));
        assert_eq!(decode_utf8(0xbfbf_8ff4), Ok(0x10ffff));
    }

    #[test]
    fn masking_ignores_trailing_bytes() {
        let c = make_char('é');
        let block = c.word().block();
        block.set_u32_at(CHAR_UTF8_OFFSET, 0xff00_a9c3);
        assert_eq!(masked_utf8(block), 0xa9c3);
        assert_eq!(char_code(&c), Ok(0xe9));
    }

    #[test]
    fn to_string() {
        let s = char_to_string(&make_char('ß')).unwrap();
        assert_eq!(string_as_str(&s), Ok("ß"));
    }
}
