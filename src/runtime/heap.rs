//! Reference-counted block allocator.
//!
//! Each block is preceded by a hidden [`BlockPrefix`] holding its count and
//! size; the word value of a heap pointer is the address just past the prefix.
//! Memory comes from `calloc`, so payloads start zeroed.

use std::{
    alloc::{handle_alloc_error, Layout},
    cell::Cell,
    mem::size_of,
};

use crate::{options::options, utils::round_up};

use super::{
    object::{BlockRef, HeapKind},
    value::{Word, WORD_SIZE},
};

#[repr(C)]
struct BlockPrefix {
    refcount: u32,
    size: u32,
}

const PREFIX_SIZE: usize = size_of::<BlockPrefix>();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub live_blocks: usize,
    pub live_bytes: usize,
    pub allocations: u64,
}

thread_local! {
    static STATS: Cell<HeapStats> = Cell::new(HeapStats::default());
}

/// Allocation and occupancy counters for the current thread.
pub fn stats() -> HeapStats {
    STATS.with(|stats| stats.get())
}

fn update_stats(f: impl FnOnce(&mut HeapStats)) {
    STATS.with(|stats| {
        let mut s = stats.get();
        f(&mut s);
        stats.set(s);
    });
}

#[cold]
fn out_of_memory(size: usize) -> ! {
    let layout = Layout::from_size_align(size, WORD_SIZE).unwrap_or(Layout::new::<BlockPrefix>());
    handle_alloc_error(layout)
}

#[inline(always)]
fn prefix(block: BlockRef) -> *mut BlockPrefix {
    unsafe { block.as_ptr().sub(PREFIX_SIZE).cast::<BlockPrefix>() }
}

/// Allocates a zeroed block of `size` bytes stamped with `kind`, count 1.
///
/// Running out of memory is fatal.
pub fn allocate(kind: HeapKind, size: usize) -> BlockRef {
    let size = round_up(size.max(WORD_SIZE), WORD_SIZE);
    let Ok(recorded) = u32::try_from(size) else {
        out_of_memory(size)
    };

    let total = PREFIX_SIZE + size;
    let raw = unsafe { libc::calloc(1, total) } as *mut u8;

    if raw.is_null() {
        out_of_memory(total);
    }

    let block = unsafe {
        raw.cast::<BlockPrefix>().write(BlockPrefix {
            refcount: 1,
            size: recorded,
        });
        BlockRef::from_raw(raw.add(PREFIX_SIZE))
    };
    block.set_kind(kind);

    update_stats(|s| {
        s.live_blocks += 1;
        s.live_bytes += size;
        s.allocations += 1;
    });

    if options().trace_heap {
        log::trace!(target: "corvid::heap", "allocate {:?} ({} bytes) at {:#x}", kind, size, block.addr());
    }

    block
}

/// Adds an owning reference. No-op for immediates.
#[inline(always)]
pub fn acquire(word: Word) {
    if word.is_heap_ptr() {
        unsafe {
            let prefix = prefix(word.block());
            debug_assert!((*prefix).refcount > 0, "acquire of a dead block {:?}", word);
            (*prefix).refcount += 1;
        }
    }
}

/// Drops an owning reference, reclaiming the block (and whatever it alone
/// kept alive) when the count reaches zero. No-op for immediates.
#[inline(always)]
pub fn release(word: Word) {
    if word.is_heap_ptr() && decrement(word.block()) {
        release_slow(word.block());
    }
}

/// Returns true when the count dropped to zero.
#[inline(always)]
fn decrement(block: BlockRef) -> bool {
    unsafe {
        let prefix = prefix(block);
        debug_assert!((*prefix).refcount > 0, "release of a dead block {:#x}", block.addr());
        (*prefix).refcount -= 1;
        (*prefix).refcount == 0
    }
}

#[cold]
fn release_slow(block: BlockRef) {
    // Children are released from a work list so long chains don't recurse.
    let mut pending = Vec::new();
    reclaim(block, &mut pending);

    while let Some(word) = pending.pop() {
        if word.is_heap_ptr() && decrement(word.block()) {
            reclaim(word.block(), &mut pending);
        }
    }
}

fn reclaim(block: BlockRef, pending: &mut Vec<Word>) {
    let kind = block.kind();
    if kind.is_composite() {
        pending.extend(block.fields());
    }

    let size = unsafe { (*prefix(block)).size } as usize;

    if options().trace_heap {
        log::trace!(target: "corvid::heap", "free {:?} ({} bytes) at {:#x}", kind, size, block.addr());
    }

    unsafe { libc::free(prefix(block).cast::<libc::c_void>()) };

    update_stats(|s| {
        s.live_blocks -= 1;
        s.live_bytes -= size;
    });
}

/// Current count of a heap word; zero for immediates.
pub fn refcount(word: Word) -> u32 {
    if word.is_heap_ptr() {
        unsafe { (*prefix(word.block())).refcount }
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{
        composite::tuple_set,
        factory::{make_string, make_tuple},
        value::Value,
    };

    #[test]
    fn allocation_is_counted_and_zeroed() {
        let before = stats();
        let block = allocate(HeapKind::Tuple, 40);
        assert_eq!(block.addr() % WORD_SIZE, 0);
        assert_eq!(block.kind(), HeapKind::Tuple);
        for offset in (8..40).step_by(8) {
            assert_eq!(block.u64_at(offset), 0);
        }
        assert_eq!(refcount(Word::from_block(block)), 1);
        assert_eq!(stats().live_blocks, before.live_blocks + 1);

        release(Word::from_block(block));
        assert_eq!(stats().live_blocks, before.live_blocks);
        assert_eq!(stats().live_bytes, before.live_bytes);
    }

    #[test]
    fn immediates_are_ignored() {
        acquire(Word::TRUE);
        release(Word::TRUE);
        release(Word::EMPTY);
        assert_eq!(refcount(Word::simple(3).unwrap()), 0);
    }

    #[test]
    fn releasing_a_parent_releases_its_children() {
        let before = stats().live_blocks;
        let child = make_string("child");
        let parent = make_tuple(vec![child.clone(), Value::void()]);
        assert_eq!(refcount(child.word()), 2);

        drop(parent);
        assert_eq!(refcount(child.word()), 1);
        drop(child);
        assert_eq!(stats().live_blocks, before);
    }

    #[test]
    fn long_chains_release_without_recursing() {
        let before = stats().live_blocks;
        let mut list = Value::void();
        for _ in 0..200_000 {
            list = make_tuple(vec![Value::bool(true), list]);
        }
        drop(list);
        assert_eq!(stats().live_blocks, before);
    }

    #[test]
    fn cycles_are_kept_alive() {
        let before = stats().live_blocks;
        let cell = make_tuple(vec![Value::void()]);
        tuple_set(&cell, 0, cell.clone()).unwrap();
        assert_eq!(refcount(cell.word()), 2);
        drop(cell);
        // Plain reference counting cannot reclaim a self-referential block.
        assert_eq!(stats().live_blocks, before + 1);
    }
}
