//! Object factory.
//!
//! Constructors for every heap kind except numbers (see `number`) and chars
//! (see `char`). Each returns a fresh block with count 1 and takes ownership of
//! the values it stores.

use super::{
    heap,
    object::*,
    value::{Value, Word, WORD_SIZE},
};

#[inline]
fn length_u32(len: usize) -> u32 {
    match u32::try_from(len) {
        Ok(len) => len,
        Err(_) => panic!("object length {} exceeds the 32-bit length field", len),
    }
}

/// A string or byte block holding `len` zeroed bytes.
pub(crate) fn alloc_byte_block(kind: HeapKind, len: usize) -> BlockRef {
    debug_assert!(matches!(kind, HeapKind::String | HeapKind::Bytes));
    let block = heap::allocate(kind, BYTES_DATA_OFFSET + len);
    block.set_u32_at(BYTES_LENGTH_OFFSET, length_u32(len));
    block
}

pub(crate) fn make_byte_block(kind: HeapKind, bytes: &[u8]) -> Value {
    let block = alloc_byte_block(kind, bytes.len());
    unsafe {
        block.bytes_mut().copy_from_slice(bytes);
        Value::from_word(Word::from_block(block))
    }
}

/// Allocates a composite with `count` empty fields and a kind-specific header.
fn alloc_composite(kind: HeapKind, count: usize, header: impl FnOnce(BlockRef)) -> BlockRef {
    debug_assert!(kind.is_composite());
    let block = heap::allocate(kind, kind.fields_offset() + count * WORD_SIZE);
    block.set_u32_at(kind.length_offset(), length_u32(count));
    header(block);
    block
}

fn fill_composite(block: BlockRef, fields: Vec<Value>) -> Value {
    for (i, field) in fields.into_iter().enumerate() {
        block.set_field(i, field.into_word());
    }
    unsafe { Value::from_word(Word::from_block(block)) }
}

pub fn make_string(s: &str) -> Value {
    make_byte_block(HeapKind::String, s.as_bytes())
}

pub fn make_tuple(fields: Vec<Value>) -> Value {
    let block = alloc_composite(HeapKind::Tuple, fields.len(), |_| ());
    fill_composite(block, fields)
}

pub fn make_array(elements: Vec<Value>) -> Value {
    let block = alloc_composite(HeapKind::Array, elements.len(), |_| ());
    fill_composite(block, elements)
}

/// An array of `len` references to `fill`.
pub fn make_array_filled(len: usize, fill: &Value) -> Value {
    let block = alloc_composite(HeapKind::Array, len, |_| ());
    for i in 0..len {
        block.set_field(i, fill.clone().into_word());
    }
    unsafe { Value::from_word(Word::from_block(block)) }
}

pub fn make_record(module_id: u32, type_id: u32, fields: Vec<Value>) -> Value {
    let block = alloc_composite(HeapKind::Record, fields.len(), |block| {
        block.set_u32_at(RECORD_MODULE_OFFSET, module_id);
        block.set_u32_at(RECORD_TYPE_OFFSET, type_id);
    });
    fill_composite(block, fields)
}

pub fn make_adt(module_id: u32, type_id: u32, variant_id: u32, fields: Vec<Value>) -> Value {
    let block = alloc_composite(HeapKind::Adt, fields.len(), |block| {
        block.set_u32_at(ADT_MODULE_OFFSET, module_id);
        block.set_u32_at(ADT_TYPE_OFFSET, type_id);
        block.set_u32_at(ADT_VARIANT_OFFSET, variant_id);
    });
    fill_composite(block, fields)
}

/// A closure over function `func_index` taking `arity` arguments.
pub fn make_closure(arity: u32, func_index: u32, captured: Vec<Value>) -> Value {
    let block = alloc_composite(HeapKind::Closure, captured.len(), |block| {
        block.set_u32_at(CLOSURE_ARITY_OFFSET, arity);
        block.set_u32_at(CLOSURE_FUNC_OFFSET, func_index);
    });
    fill_composite(block, captured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::heap::{refcount, stats};

    #[test]
    fn composites_take_ownership_of_fields() {
        let s = make_string("x");
        let t = make_tuple(vec![s.clone(), Value::bool(true)]);
        assert_eq!(refcount(s.word()), 2);
        assert_eq!(t.word().block().field(1), Word::TRUE);
    }

    #[test]
    fn filled_arrays_share_the_fill() {
        let before = stats().live_blocks;
        let s = make_string("fill");
        let a = make_array_filled(3, &s);
        assert_eq!(refcount(s.word()), 4);
        drop(a);
        assert_eq!(refcount(s.word()), 1);
        drop(s);
        assert_eq!(stats().live_blocks, before);
    }

    #[test]
    fn closure_header() {
        let c = make_closure(2, 17, vec![Value::void()]);
        let block = c.word().block();
        assert_eq!(block.kind(), HeapKind::Closure);
        assert_eq!(block.u32_at(CLOSURE_ARITY_OFFSET), 2);
        assert_eq!(block.u32_at(CLOSURE_FUNC_OFFSET), 17);
        assert_eq!(block.field_count(), 1);
    }

    #[test]
    fn empty_string_has_a_header() {
        let s = make_string("");
        assert_eq!(s.word().block().byte_len(), 0);
    }
}
