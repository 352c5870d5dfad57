use std::{fmt, marker::PhantomData, mem::ManuallyDrop};

use crate::utils::bitfield::BitField;

use super::{
    heap,
    object::{BlockRef, HeapKind},
};

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        pub const WORD_SIZE: usize = 8;
    } else {
        compile_error!("corvid values are 64-bit words; 32-bit targets are not supported");
    }
}

/// Low three bits of a word.
pub type TagField = BitField<3, 0, false>;
/// Low bit of a word; set for simple numbers.
pub type NumberTagField = BitField<1, 0, false>;
/// Sign-extended payload of a simple number.
pub type SimpleNumberField = BitField<63, 1, true>;

/// A raw tagged machine word.
///
/// ```text
///     ....:...1   simple number, 63-bit two's complement in bits 1..63
///     ....:.110   constant (false = 0x06, true = 0x0e, void = 0x16)
///     ....:.000   pointer to a heap block (never zero)
///     0000:0000   empty; the contents of a freshly zeroed field
/// ```
///
/// Heap blocks are 8-byte aligned, so the three tag bits of a pointer are
/// always clear and the discriminant is readable from the bit pattern alone.
/// A `Word` carries no ownership; see [`Value`] for the counted handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Word(u64);

impl Word {
    pub const NUMBER_TAG: u64 = 0b1;
    pub const CONST_TAG: u64 = 0b110;
    pub const HEAP_TAG: u64 = 0b000;

    pub const EMPTY: Word = Word(0);
    pub const FALSE: Word = Word(0x06);
    pub const TRUE: Word = Word(0x0e);
    pub const VOID: Word = Word(0x16);

    pub const SIMPLE_MIN: i64 = -(1 << 62);
    pub const SIMPLE_MAX: i64 = (1 << 62) - 1;

    /// Reinterprets raw bits as a word.
    ///
    /// # Safety
    ///
    /// If the bits carry the heap tag they must be the address of a live block
    /// produced by [`heap::allocate`].
    #[inline(always)]
    pub const unsafe fn from_raw(bits: u64) -> Self {
        Self(bits)
    }

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub fn from_block(block: BlockRef) -> Self {
        Self(block.addr() as u64)
    }

    #[inline(always)]
    pub fn simple(x: i64) -> Option<Self> {
        if !SimpleNumberField::is_valid(x as u64) {
            return None;
        }

        Some(Self(SimpleNumberField::encode(x as u64) | Self::NUMBER_TAG))
    }

    #[inline(always)]
    pub const fn bool(x: bool) -> Self {
        if x {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    #[inline(always)]
    pub fn is_simple_number(self) -> bool {
        NumberTagField::decode(self.0) == Self::NUMBER_TAG
    }

    #[inline(always)]
    pub fn is_constant(self) -> bool {
        TagField::decode(self.0) == Self::CONST_TAG
    }

    #[inline(always)]
    pub fn is_heap_ptr(self) -> bool {
        TagField::decode(self.0) == Self::HEAP_TAG && self.0 != 0
    }

    #[inline(always)]
    pub fn is_immediate(self) -> bool {
        !self.is_heap_ptr()
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    #[inline(always)]
    pub fn is_bool(self) -> bool {
        self == Self::TRUE || self == Self::FALSE
    }

    #[inline(always)]
    pub fn is_void(self) -> bool {
        self == Self::VOID
    }

    #[inline(always)]
    pub fn get_simple(self) -> i64 {
        debug_assert!(self.is_simple_number(), "{:?}", self);
        SimpleNumberField::decode(self.0) as i64
    }

    #[inline(always)]
    pub fn block(self) -> BlockRef {
        debug_assert!(self.is_heap_ptr(), "{:?}", self);
        // SAFETY: heap-tagged words only come from `heap::allocate` (or the
        // unsafe `from_raw`, whose caller vouched for the address).
        unsafe { BlockRef::from_raw(self.0 as usize as *mut u8) }
    }

    #[inline(always)]
    pub fn heap_kind(self) -> Option<HeapKind> {
        if self.is_heap_ptr() {
            Some(self.block().kind())
        } else {
            None
        }
    }

    pub fn type_name(self) -> &'static str {
        if self.is_simple_number() {
            "Number"
        } else if self.is_bool() {
            "Bool"
        } else if self.is_void() {
            "Void"
        } else if self.is_empty() {
            "Empty"
        } else if let Some(kind) = self.heap_kind() {
            kind.name()
        } else {
            "Unknown"
        }
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:#x})", self.0)
    }
}

/// One owned reference to a tagged value.
///
/// Passing a `Value` by move hands its reference to the callee, which must
/// release it (dropping does that) or pass it on. `clone` acquires a new
/// reference. Counts are plain integers, so values never cross threads.
#[repr(transparent)]
pub struct Value {
    word: Word,
    _marker: PhantomData<*mut ()>,
}

impl Value {
    /// Adopts one reference already counted for `word`.
    ///
    /// # Safety
    ///
    /// The caller gives up a reference it owns; a heap word must point at a
    /// live block.
    #[inline(always)]
    pub unsafe fn from_word(word: Word) -> Self {
        Self {
            word,
            _marker: PhantomData,
        }
    }

    /// Acquires a fresh reference to a word that somebody else owns.
    ///
    /// # Safety
    ///
    /// A heap word must point at a live block.
    #[inline(always)]
    pub unsafe fn from_borrowed_word(word: Word) -> Self {
        heap::acquire(word);
        Self::from_word(word)
    }

    #[inline(always)]
    const fn immediate(word: Word) -> Self {
        Self {
            word,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn word(&self) -> Word {
        self.word
    }

    /// Gives up ownership without releasing; the caller now owns the reference.
    #[inline(always)]
    pub fn into_word(self) -> Word {
        let this = ManuallyDrop::new(self);
        this.word
    }

    #[inline(always)]
    pub const fn bool(x: bool) -> Self {
        Self::immediate(Word::bool(x))
    }

    #[inline(always)]
    pub const fn void() -> Self {
        Self::immediate(Word::VOID)
    }

    #[inline(always)]
    pub const fn empty() -> Self {
        Self::immediate(Word::EMPTY)
    }

    /// A simple number, if `x` fits in 63 bits.
    #[inline(always)]
    pub fn simple(x: i64) -> Option<Self> {
        Word::simple(x).map(Self::immediate)
    }

    #[inline(always)]
    pub fn is_immediate(&self) -> bool {
        self.word.is_immediate()
    }

    #[inline(always)]
    pub fn is_heap_ptr(&self) -> bool {
        self.word.is_heap_ptr()
    }

    #[inline(always)]
    pub fn is_simple_number(&self) -> bool {
        self.word.is_simple_number()
    }

    #[inline(always)]
    pub fn is_bool(&self) -> bool {
        self.word.is_bool()
    }

    #[inline(always)]
    pub fn is_void(&self) -> bool {
        self.word.is_void()
    }

    #[inline(always)]
    pub fn get_bool(&self) -> Option<bool> {
        if self.is_bool() {
            Some(self.word == Word::TRUE)
        } else {
            None
        }
    }

    #[inline(always)]
    pub fn heap_kind(&self) -> Option<HeapKind> {
        self.word.heap_kind()
    }

    #[inline(always)]
    pub fn type_name(&self) -> &'static str {
        self.word.type_name()
    }

    /// Identity comparison of the underlying words.
    #[inline(always)]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        self.word == other.word
    }
}

impl Clone for Value {
    #[inline(always)]
    fn clone(&self) -> Self {
        heap::acquire(self.word);
        Self {
            word: self.word,
            _marker: PhantomData,
        }
    }
}

impl Drop for Value {
    #[inline(always)]
    fn drop(&mut self) {
        heap::release(self.word);
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::bool(x)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::void()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:#x})", self.word.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::factory::make_tuple;

    #[test]
    fn immediates_are_discriminated_by_bits() {
        let five = Word::simple(5).unwrap();
        assert_eq!(five.raw(), 0b1011);
        assert!(five.is_simple_number());
        assert!(five.is_immediate());
        assert_eq!(five.get_simple(), 5);

        for constant in [Word::TRUE, Word::FALSE, Word::VOID] {
            assert!(constant.is_constant());
            assert!(!constant.is_simple_number());
            assert!(!constant.is_heap_ptr());
        }

        assert!(Word::EMPTY.is_immediate());
        assert!(!Word::EMPTY.is_heap_ptr());
    }

    #[test]
    fn simple_number_range() {
        assert_eq!(Word::simple(Word::SIMPLE_MIN).unwrap().get_simple(), Word::SIMPLE_MIN);
        assert_eq!(Word::simple(Word::SIMPLE_MAX).unwrap().get_simple(), Word::SIMPLE_MAX);
        assert_eq!(Word::simple(-1).unwrap().get_simple(), -1);
        assert!(Word::simple(Word::SIMPLE_MAX + 1).is_none());
        assert!(Word::simple(Word::SIMPLE_MIN - 1).is_none());
        assert!(Word::simple(i64::MIN).is_none());
    }

    #[test]
    fn heap_words_are_aligned_pointers() {
        let tuple = make_tuple(vec![Value::bool(true)]);
        assert!(tuple.is_heap_ptr());
        assert_eq!(tuple.word().raw() & 0b111, 0);
        assert_eq!(tuple.heap_kind(), Some(HeapKind::Tuple));
        assert_eq!(tuple.type_name(), "Tuple");
    }

    #[test]
    fn clone_and_drop_track_the_count() {
        let tuple = make_tuple(vec![]);
        assert_eq!(heap::refcount(tuple.word()), 1);
        let other = tuple.clone();
        assert_eq!(heap::refcount(tuple.word()), 2);
        drop(other);
        assert_eq!(heap::refcount(tuple.word()), 1);

        let word = tuple.into_word();
        assert_eq!(heap::refcount(word), 1);
        drop(unsafe { Value::from_word(word) });
    }
}
