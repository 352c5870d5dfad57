//! Heap block layouts.
//!
//! Every block starts with a `u32` kind tag, followed by a kind-specific
//! length or metadata header, followed by the payload. Offsets below are
//! relative to the block address (the word value of a heap pointer) and must
//! stay bit-exact: generated code reads these blocks directly.

use std::ptr::NonNull;

use super::{
    error::{Expected, RuntimeError},
    value::{Value, Word, WORD_SIZE},
};
use crate::RtResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum HeapKind {
    String = 1,
    Char,
    Adt,
    Record,
    Array,
    BoxedNum,
    Closure,
    Tuple,
    Bytes,
}

impl HeapKind {
    pub const fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            1 => HeapKind::String,
            2 => HeapKind::Char,
            3 => HeapKind::Adt,
            4 => HeapKind::Record,
            5 => HeapKind::Array,
            6 => HeapKind::BoxedNum,
            7 => HeapKind::Closure,
            8 => HeapKind::Tuple,
            9 => HeapKind::Bytes,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            HeapKind::String => "String",
            HeapKind::Char => "Char",
            HeapKind::Adt => "Variant",
            HeapKind::Record => "Record",
            HeapKind::Array => "Array",
            HeapKind::BoxedNum => "Number",
            HeapKind::Closure => "Closure",
            HeapKind::Tuple => "Tuple",
            HeapKind::Bytes => "Bytes",
        }
    }

    /// Kinds whose payload is a sequence of tagged words.
    pub const fn is_composite(self) -> bool {
        matches!(
            self,
            HeapKind::Adt | HeapKind::Record | HeapKind::Array | HeapKind::Closure | HeapKind::Tuple
        )
    }

    /// Offset of the `u32` holding the number of payload words (or bytes).
    pub const fn length_offset(self) -> usize {
        match self {
            HeapKind::String | HeapKind::Bytes => BYTES_LENGTH_OFFSET,
            HeapKind::Tuple | HeapKind::Array => TUPLE_LENGTH_OFFSET,
            HeapKind::Record => RECORD_ARITY_OFFSET,
            HeapKind::Adt => ADT_ARITY_OFFSET,
            HeapKind::Closure => CLOSURE_SIZE_OFFSET,
            HeapKind::Char | HeapKind::BoxedNum => 0,
        }
    }

    /// Offset of the first payload word of a composite.
    pub const fn fields_offset(self) -> usize {
        match self {
            HeapKind::Tuple | HeapKind::Array => TUPLE_FIELDS_OFFSET,
            HeapKind::Record => RECORD_FIELDS_OFFSET,
            HeapKind::Adt => ADT_FIELDS_OFFSET,
            HeapKind::Closure => CLOSURE_FIELDS_OFFSET,
            HeapKind::String | HeapKind::Bytes => BYTES_DATA_OFFSET,
            HeapKind::Char | HeapKind::BoxedNum => 0,
        }
    }

    pub const fn expected(self) -> Expected {
        match self {
            HeapKind::String => Expected::String,
            HeapKind::Char => Expected::Char,
            HeapKind::Adt => Expected::Variant,
            HeapKind::Record => Expected::Record,
            HeapKind::Array => Expected::Array,
            HeapKind::BoxedNum => Expected::Number,
            HeapKind::Closure => Expected::Closure,
            HeapKind::Tuple => Expected::Tuple,
            HeapKind::Bytes => Expected::Bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BoxedNumTag {
    Float32 = 1,
    Float64,
    Int32,
    Int64,
    Rational,
}

impl BoxedNumTag {
    pub const fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            1 => BoxedNumTag::Float32,
            2 => BoxedNumTag::Float64,
            3 => BoxedNumTag::Int32,
            4 => BoxedNumTag::Int64,
            5 => BoxedNumTag::Rational,
            _ => return None,
        })
    }
}

pub const KIND_OFFSET: usize = 0;

pub const BYTES_LENGTH_OFFSET: usize = 4;
pub const BYTES_DATA_OFFSET: usize = 8;

pub const CHAR_UTF8_OFFSET: usize = 4;
pub const CHAR_SIZE: usize = 8;

pub const TUPLE_LENGTH_OFFSET: usize = 4;
pub const TUPLE_FIELDS_OFFSET: usize = 8;

pub const RECORD_MODULE_OFFSET: usize = 4;
pub const RECORD_TYPE_OFFSET: usize = 8;
pub const RECORD_ARITY_OFFSET: usize = 12;
pub const RECORD_FIELDS_OFFSET: usize = 16;

pub const ADT_MODULE_OFFSET: usize = 4;
pub const ADT_TYPE_OFFSET: usize = 8;
pub const ADT_VARIANT_OFFSET: usize = 12;
pub const ADT_ARITY_OFFSET: usize = 16;
pub const ADT_FIELDS_OFFSET: usize = 24;

pub const CLOSURE_ARITY_OFFSET: usize = 4;
pub const CLOSURE_FUNC_OFFSET: usize = 8;
pub const CLOSURE_SIZE_OFFSET: usize = 12;
pub const CLOSURE_FIELDS_OFFSET: usize = 16;

pub const NUM_SUBTYPE_OFFSET: usize = 4;
pub const NUM_PAYLOAD_OFFSET: usize = 8;
pub const RATIONAL_DENOMINATOR_OFFSET: usize = 16;
pub const BOXED_NUM_SIZE: usize = 16;
pub const RATIONAL_SIZE: usize = 24;

/// Address of a live heap block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct BlockRef(NonNull<u8>);

impl BlockRef {
    /// # Safety
    ///
    /// `ptr` must be the address of a live block returned by `heap::allocate`.
    #[inline(always)]
    pub unsafe fn from_raw(ptr: *mut u8) -> Self {
        debug_assert!(ptr as usize % WORD_SIZE == 0);
        Self(NonNull::new_unchecked(ptr))
    }

    #[inline(always)]
    pub fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    #[inline(always)]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    #[inline(always)]
    pub fn u32_at(self, offset: usize) -> u32 {
        debug_assert!(offset % 4 == 0);
        unsafe { u32::from_le(self.as_ptr().add(offset).cast::<u32>().read()) }
    }

    #[inline(always)]
    pub fn set_u32_at(self, offset: usize, value: u32) {
        debug_assert!(offset % 4 == 0);
        unsafe { self.as_ptr().add(offset).cast::<u32>().write(value.to_le()) }
    }

    #[inline(always)]
    pub fn u64_at(self, offset: usize) -> u64 {
        debug_assert!(offset % 8 == 0);
        unsafe { u64::from_le(self.as_ptr().add(offset).cast::<u64>().read()) }
    }

    #[inline(always)]
    pub fn set_u64_at(self, offset: usize, value: u64) {
        debug_assert!(offset % 8 == 0);
        unsafe { self.as_ptr().add(offset).cast::<u64>().write(value.to_le()) }
    }

    #[inline(always)]
    pub fn kind(self) -> HeapKind {
        match HeapKind::from_tag(self.u32_at(KIND_OFFSET)) {
            Some(kind) => kind,
            None => unreachable!("corrupt heap block header at {:#x}", self.addr()),
        }
    }

    #[inline(always)]
    pub fn set_kind(self, kind: HeapKind) {
        self.set_u32_at(KIND_OFFSET, kind as u32);
    }

    /// Number of payload words of a composite, zero for every other kind.
    #[inline(always)]
    pub fn field_count(self) -> usize {
        let kind = self.kind();
        if kind.is_composite() {
            self.u32_at(kind.length_offset()) as usize
        } else {
            0
        }
    }

    #[inline(always)]
    pub fn field(self, index: usize) -> Word {
        debug_assert!(index < self.field_count());
        let offset = self.kind().fields_offset() + index * WORD_SIZE;
        // SAFETY: composites only ever store words produced by this crate.
        unsafe { Word::from_raw(self.u64_at(offset)) }
    }

    /// Overwrites a field without touching any counts.
    #[inline(always)]
    pub fn set_field(self, index: usize, word: Word) {
        debug_assert!(index < self.field_count());
        let offset = self.kind().fields_offset() + index * WORD_SIZE;
        self.set_u64_at(offset, word.raw());
    }

    pub fn fields(self) -> impl Iterator<Item = Word> {
        (0..self.field_count()).map(move |i| self.field(i))
    }

    /// Length in bytes of a string or byte buffer.
    #[inline(always)]
    pub fn byte_len(self) -> usize {
        debug_assert!(matches!(self.kind(), HeapKind::String | HeapKind::Bytes));
        self.u32_at(BYTES_LENGTH_OFFSET) as usize
    }

    /// # Safety
    ///
    /// The block must stay alive and unmodified while the slice is in use.
    #[inline(always)]
    pub unsafe fn bytes<'a>(self) -> &'a [u8] {
        std::slice::from_raw_parts(self.as_ptr().add(BYTES_DATA_OFFSET), self.byte_len())
    }

    /// # Safety
    ///
    /// The block must stay alive and no other view of it may be in use.
    #[inline(always)]
    pub unsafe fn bytes_mut<'a>(self) -> &'a mut [u8] {
        std::slice::from_raw_parts_mut(self.as_ptr().add(BYTES_DATA_OFFSET), self.byte_len())
    }
}

/// The block behind `value`, provided it is a heap block of `kind`.
pub fn expect_block(value: &Value, kind: HeapKind) -> RtResult<BlockRef> {
    match value.heap_kind() {
        Some(k) if k == kind => Ok(value.word().block()),
        _ => Err(RuntimeError::wrong_type(kind.expected(), value.type_name())),
    }
}
