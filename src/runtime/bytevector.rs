//! Byte buffers.
//!
//! Typed accessors are little-endian. Indexed access fails with
//! `IndexOutOfBounds`; range operations (`slice`, `resize`, `move`) fail with
//! `InvalidArgument`.

use std::mem::size_of;

use super::{
    error::RuntimeError,
    factory::{alloc_byte_block, make_byte_block},
    object::{expect_block, BlockRef, HeapKind, BYTES_DATA_OFFSET},
    value::{Value, Word},
};
use crate::RtResult;

fn expect_bytes(bytes: &Value) -> RtResult<BlockRef> {
    expect_block(bytes, HeapKind::Bytes)
}

fn fresh(len: usize) -> (BlockRef, Value) {
    let block = alloc_byte_block(HeapKind::Bytes, len);
    (block, unsafe { Value::from_word(Word::from_block(block)) })
}

/// Validates `index..index + width` against a buffer of `size` bytes.
fn checked_offset(index: i64, width: usize, size: usize) -> RtResult<usize> {
    if index < 0 || index as i128 + width as i128 > size as i128 {
        Err(RuntimeError::index_out_of_bounds(index, width, size))
    } else {
        Ok(index as usize)
    }
}

fn checked_range(what: &str, start: i64, len: i64, size: usize) -> RtResult<(usize, usize)> {
    if start < 0 || len < 0 || start as i128 + len as i128 > size as i128 {
        Err(RuntimeError::invalid_argument(format!(
            "{}: range {}+{} outside buffer of {} byte(s)",
            what, start, len, size
        )))
    } else {
        Ok((start as usize, len as usize))
    }
}

/// A zeroed buffer of `len` bytes.
pub fn make_bytes(len: usize) -> Value {
    fresh(len).1
}

pub fn bytes_from_slice(data: &[u8]) -> Value {
    make_byte_block(HeapKind::Bytes, data)
}

pub fn bytes_length(bytes: &Value) -> RtResult<usize> {
    Ok(expect_bytes(bytes)?.byte_len())
}

pub fn bytes_as_slice(bytes: &Value) -> RtResult<&[u8]> {
    let block = expect_bytes(bytes)?;
    // SAFETY: `bytes` keeps the block alive for the returned lifetime.
    Ok(unsafe { block.bytes() })
}

/// Copies the bytes of a string without validating or re-encoding them.
pub fn bytes_from_string(s: &Value) -> RtResult<Value> {
    let block = expect_block(s, HeapKind::String)?;
    Ok(make_byte_block(HeapKind::Bytes, unsafe { block.bytes() }))
}

/// Copies the bytes into a string, as is.
pub fn bytes_to_string(bytes: &Value) -> RtResult<Value> {
    Ok(make_byte_block(HeapKind::String, bytes_as_slice(bytes)?))
}

pub fn bytes_copy(bytes: &Value) -> RtResult<Value> {
    Ok(bytes_from_slice(bytes_as_slice(bytes)?))
}

/// Sets every byte to the low 8 bits of `value`.
pub fn bytes_fill(bytes: &Value, value: i64) -> RtResult<()> {
    let block = expect_bytes(bytes)?;
    unsafe { block.bytes_mut().fill(value as u8) };
    Ok(())
}

pub fn bytes_clear(bytes: &Value) -> RtResult<()> {
    bytes_fill(bytes, 0)
}

pub fn bytes_slice(bytes: &Value, start: i64, len: i64) -> RtResult<Value> {
    let data = bytes_as_slice(bytes)?;
    let (start, len) = checked_range("slice", start, len, data.len())?;
    Ok(bytes_from_slice(&data[start..start + len]))
}

/// A new buffer grown or shrunk by `left` bytes at the front and `right`
/// bytes at the back. Negative counts drop bytes; added bytes are zero.
pub fn bytes_resize(bytes: &Value, left: i64, right: i64) -> RtResult<Value> {
    let data = bytes_as_slice(bytes)?;
    let size = data.len() as i64;
    let new_size = size
        .checked_add(left)
        .and_then(|n| n.checked_add(right))
        .filter(|n| *n >= 0)
        .ok_or_else(|| {
            RuntimeError::invalid_argument(format!(
                "resize: cannot resize {} byte(s) by {} and {}",
                size, left, right
            ))
        })?;

    let src_offset = if left < 0 { -left } else { 0 };
    let dst_offset = if left > 0 { left } else { 0 };
    let len = size + right.min(0) - src_offset;

    let (block, result) = fresh(new_size as usize);
    if len > 0 {
        let (src, dst, len) = (src_offset as usize, dst_offset as usize, len as usize);
        unsafe { block.bytes_mut()[dst..dst + len].copy_from_slice(&data[src..src + len]) };
    }
    Ok(result)
}

/// Copies `len` bytes from `src[src_index..]` to `dst[dst_index..]`. The two
/// buffers may be the same and the ranges may overlap.
pub fn bytes_move(src_index: i64, dst_index: i64, len: i64, src: &Value, dst: &Value) -> RtResult<()> {
    let src_block = expect_bytes(src)?;
    let dst_block = expect_bytes(dst)?;
    let (from, count) = checked_range("move", src_index, len, src_block.byte_len())?;
    let (to, _) = checked_range("move", dst_index, len, dst_block.byte_len())?;

    unsafe {
        std::ptr::copy(
            src_block.as_ptr().add(BYTES_DATA_OFFSET + from),
            dst_block.as_ptr().add(BYTES_DATA_OFFSET + to),
            count,
        );
    }
    Ok(())
}

/// `a` followed by `b`: `a` resized by `len(b)` on the right, then `b`
/// moved into the tail.
pub fn bytes_concat(a: &Value, b: &Value) -> RtResult<Value> {
    let tail = bytes_length(b)? as i64;
    let result = bytes_resize(a, 0, tail)?;
    bytes_move(0, bytes_length(a)? as i64, tail, b, &result)?;
    Ok(result)
}

macro_rules! typed_accessors {
    ($(($name: ident, $t: ty)),*) => {
        paste::paste! {
            $(
                pub fn [<bytes_get_ $name>](bytes: &Value, index: i64) -> RtResult<$t> {
                    let data = bytes_as_slice(bytes)?;
                    let offset = checked_offset(index, size_of::<$t>(), data.len())?;
                    let mut raw = [0u8; size_of::<$t>()];
                    raw.copy_from_slice(&data[offset..offset + size_of::<$t>()]);
                    Ok(<$t>::from_le_bytes(raw))
                }
            )*
        }
    };
}

typed_accessors! {
    (int8_s, i8),
    (int8_u, u8),
    (int16_s, i16),
    (int16_u, u16),
    (int32_s, i32),
    (int32_u, u32),
    (int64, i64),
    (float32, f32),
    (float64, f64)
}

macro_rules! typed_setters {
    ($(($name: ident, $arg: ty, $t: ty)),*) => {
        paste::paste! {
            $(
                pub fn [<bytes_set_ $name>](bytes: &Value, index: i64, value: $arg) -> RtResult<()> {
                    let block = expect_bytes(bytes)?;
                    let offset = checked_offset(index, size_of::<$t>(), block.byte_len())?;
                    let raw = (value as $t).to_le_bytes();
                    unsafe { block.bytes_mut()[offset..offset + raw.len()].copy_from_slice(&raw) };
                    Ok(())
                }
            )*
        }
    };
}

// Integer setters keep the low bits of the supplied value.
typed_setters! {
    (int8, i64, u8),
    (int16, i64, u16),
    (int32, i64, u32),
    (int64, i64, i64),
    (float32, f32, f32),
    (float64, f64, f64)
}
