use super::{
    error::RuntimeError,
    factory::alloc_byte_block,
    object::{expect_block, HeapKind},
    value::{Value, Word},
};
use crate::RtResult;

/// Length in bytes.
pub fn string_length(s: &Value) -> RtResult<usize> {
    Ok(expect_block(s, HeapKind::String)?.byte_len())
}

pub fn string_bytes(s: &Value) -> RtResult<&[u8]> {
    let block = expect_block(s, HeapKind::String)?;
    // SAFETY: `s` keeps the block alive for the returned lifetime.
    Ok(unsafe { block.bytes() })
}

/// Borrows the contents, failing if they are not valid UTF-8.
pub fn string_as_str(s: &Value) -> RtResult<&str> {
    let bytes = string_bytes(s)?;
    std::str::from_utf8(bytes).map_err(|e| {
        RuntimeError::malformed(format!("invalid UTF-8 at byte {} of string", e.valid_up_to()))
    })
}

pub fn string_concat(a: &Value, b: &Value) -> RtResult<Value> {
    let (a, b) = (string_bytes(a)?, string_bytes(b)?);
    let block = alloc_byte_block(HeapKind::String, a.len() + b.len());
    unsafe {
        let data = block.bytes_mut();
        data[..a.len()].copy_from_slice(a);
        data[a.len()..].copy_from_slice(b);
        Ok(Value::from_word(Word::from_block(block)))
    }
}
