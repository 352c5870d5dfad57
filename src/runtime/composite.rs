//! Field access for tuples, arrays, records, variants and closures.
//!
//! Reads hand back a fresh reference; writes take ownership of the new value
//! and release the one they replace.

use super::{
    error::RuntimeError,
    heap,
    object::*,
    value::Value,
};
use crate::RtResult;

fn checked_index(block: BlockRef, index: usize) -> RtResult<usize> {
    let count = block.field_count();
    if index < count {
        Ok(index)
    } else {
        Err(RuntimeError::index_out_of_bounds(index as i64, 1, count))
    }
}

fn get_field(value: &Value, kind: HeapKind, index: usize) -> RtResult<Value> {
    let block = expect_block(value, kind)?;
    let index = checked_index(block, index)?;
    Ok(unsafe { Value::from_borrowed_word(block.field(index)) })
}

fn set_field(value: &Value, kind: HeapKind, index: usize, new: Value) -> RtResult<()> {
    let block = expect_block(value, kind)?;
    let index = checked_index(block, index)?;
    let old = block.field(index);
    block.set_field(index, new.into_word());
    heap::release(old);
    Ok(())
}

pub fn tuple_length(tuple: &Value) -> RtResult<usize> {
    Ok(expect_block(tuple, HeapKind::Tuple)?.field_count())
}

pub fn tuple_get(tuple: &Value, index: usize) -> RtResult<Value> {
    get_field(tuple, HeapKind::Tuple, index)
}

pub fn tuple_set(tuple: &Value, index: usize, value: Value) -> RtResult<()> {
    set_field(tuple, HeapKind::Tuple, index, value)
}

pub fn array_length(array: &Value) -> RtResult<usize> {
    Ok(expect_block(array, HeapKind::Array)?.field_count())
}

pub fn array_get(array: &Value, index: usize) -> RtResult<Value> {
    get_field(array, HeapKind::Array, index)
}

pub fn array_set(array: &Value, index: usize, value: Value) -> RtResult<()> {
    set_field(array, HeapKind::Array, index, value)
}

pub fn record_arity(record: &Value) -> RtResult<usize> {
    Ok(expect_block(record, HeapKind::Record)?.field_count())
}

pub fn record_get(record: &Value, index: usize) -> RtResult<Value> {
    get_field(record, HeapKind::Record, index)
}

pub fn record_set(record: &Value, index: usize, value: Value) -> RtResult<()> {
    set_field(record, HeapKind::Record, index, value)
}

/// `(module_id, type_id, variant_id)` of a variant.
pub fn adt_variant(adt: &Value) -> RtResult<(u32, u32, u32)> {
    let block = expect_block(adt, HeapKind::Adt)?;
    Ok((
        block.u32_at(ADT_MODULE_OFFSET),
        block.u32_at(ADT_TYPE_OFFSET),
        block.u32_at(ADT_VARIANT_OFFSET),
    ))
}

pub fn adt_arity(adt: &Value) -> RtResult<usize> {
    Ok(expect_block(adt, HeapKind::Adt)?.field_count())
}

pub fn adt_get(adt: &Value, index: usize) -> RtResult<Value> {
    get_field(adt, HeapKind::Adt, index)
}

/// Variant payloads are immutable to user code; the runtime patches them when
/// tying recursive knots.
pub fn adt_set(adt: &Value, index: usize, value: Value) -> RtResult<()> {
    set_field(adt, HeapKind::Adt, index, value)
}

pub fn closure_captured(closure: &Value, index: usize) -> RtResult<Value> {
    get_field(closure, HeapKind::Closure, index)
}

/// `(arity, func_index)` of a closure.
pub fn closure_code(closure: &Value) -> RtResult<(u32, u32)> {
    let block = expect_block(closure, HeapKind::Closure)?;
    Ok((block.u32_at(CLOSURE_ARITY_OFFSET), block.u32_at(CLOSURE_FUNC_OFFSET)))
}
