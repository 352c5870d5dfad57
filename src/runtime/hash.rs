//! Structural hashing consistent with [`equal`](super::equality::equal).
//!
//! The mixer is the 32-bit MurmurHash3 block function over a per-process
//! random seed. A value is hashed as its unrolling to `options().hash_depth`
//! levels, so graphs that compare equal through a cycle hash alike whatever
//! block the walk starts from. Deeper structure does not contribute.

use std::{
    collections::{hash_map::RandomState, HashMap},
    hash::{BuildHasher, Hasher as _},
};

use once_cell::sync::Lazy;

use crate::options::options;

use super::{
    char::masked_utf8,
    number::{decode_word, make_integer, HashKey},
    object::{
        BlockRef, HeapKind, ADT_MODULE_OFFSET, ADT_TYPE_OFFSET, ADT_VARIANT_OFFSET,
        RECORD_MODULE_OFFSET, RECORD_TYPE_OFFSET,
    },
    value::{Value, Word},
};

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

static SEED: Lazy<u32> = Lazy::new(|| {
    if let Some(seed) = options().hash_seed {
        log::debug!("hash seed fixed by configuration");
        return seed;
    }

    let mut buf = [0u8; 4];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => {
            log::debug!("hash seed drawn from the system entropy source");
            u32::from_le_bytes(buf)
        }
        Err(err) => {
            log::warn!("entropy source unavailable ({}), deriving the hash seed from RandomState", err);
            RandomState::new().build_hasher().finish() as u32
        }
    }
});

/// The process-wide hash seed.
pub fn seed() -> u32 {
    *SEED
}

/// Incremental MurmurHash3 (x86, 32-bit).
#[derive(Debug, Clone)]
pub struct Hasher {
    h: u32,
    len: u32,
}

impl Hasher {
    pub fn new(seed: u32) -> Self {
        Self { h: seed, len: 0 }
    }

    #[inline]
    fn scramble(k: u32) -> u32 {
        k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
    }

    #[inline]
    fn mix(&mut self, k: u32) {
        self.h ^= Self::scramble(k);
        self.h = self.h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    pub fn write_u32(&mut self, k: u32) {
        self.mix(k);
        self.len = self.len.wrapping_add(4);
    }

    pub fn write_u64(&mut self, k: u64) {
        self.write_u32(k as u32);
        self.write_u32((k >> 32) as u32);
    }

    /// Mixes `bytes` in 4-byte little-endian chunks; a partial tail is
    /// scrambled into the state without the block rotation.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(4);
        for chunk in &mut chunks {
            self.mix(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            let k = tail
                .iter()
                .rev()
                .fold(0u32, |k, &byte| (k << 8) | byte as u32);
            self.h ^= Self::scramble(k);
        }
        self.len = self.len.wrapping_add(bytes.len() as u32);
    }

    /// Final avalanche over everything written so far.
    pub fn finish(&self) -> u32 {
        let mut h = self.h ^ self.len;
        h ^= h >> 16;
        h = h.wrapping_mul(0x85eb_ca6b);
        h ^= h >> 13;
        h = h.wrapping_mul(0xc2b2_ae35);
        h ^= h >> 16;
        h
    }
}

/// Hashes `x` into a non-negative simple number. Consumes the reference.
pub fn hash(x: Value) -> Value {
    make_integer(hash_value(&x) as i64)
}

pub fn hash_value(x: &Value) -> u32 {
    hash_with_seed(x, seed())
}

pub fn hash_with_seed(x: &Value, seed: u32) -> u32 {
    let mut walk = Walk {
        seed,
        max_depth: options().hash_depth,
        memo: HashMap::new(),
        truncated: false,
    };
    let mut hasher = Hasher::new(seed);
    walk.word(&mut hasher, x.word(), 0);

    if walk.truncated {
        log::trace!("hash of {} truncated at depth {}", x.type_name(), walk.max_depth);
    }
    hasher.finish()
}

/// One hashing pass. A composite hashes to the digest of its header and its
/// fields one level down, so its contribution depends only on the block and
/// the depth it is reached at; `memo` keeps shared and cyclic graphs from
/// being unrolled more than once per depth.
struct Walk {
    seed: u32,
    max_depth: u32,
    memo: HashMap<(usize, u32), u32>,
    truncated: bool,
}

impl Walk {
    fn word(&mut self, hasher: &mut Hasher, x: Word, depth: u32) {
        if depth >= self.max_depth {
            self.truncated = true;
            return;
        }

        if let Some(number) = decode_word(x) {
            Self::number(hasher, number.hash_key());
            return;
        }

        if !x.is_heap_ptr() {
            hasher.write_u64(x.raw());
            return;
        }

        let block = x.block();
        let kind = block.kind();
        hasher.write_u32(kind as u32);

        match kind {
            HeapKind::String | HeapKind::Bytes => {
                let bytes = unsafe { block.bytes() };
                hasher.write_u32(bytes.len() as u32);
                hasher.write_bytes(bytes);
            }
            HeapKind::Char => hasher.write_u32(masked_utf8(block)),
            HeapKind::Closure => hasher.write_u64(block.addr() as u64),
            // Unknown numeric subtypes only.
            HeapKind::BoxedNum => hasher.write_u64(block.addr() as u64),
            HeapKind::Tuple | HeapKind::Array | HeapKind::Record | HeapKind::Adt => {
                let digest = self.composite(block, kind, depth);
                hasher.write_u32(digest);
            }
        }
    }

    fn number(hasher: &mut Hasher, key: HashKey) {
        match key {
            HashKey::Integer(x) => {
                hasher.write_u32(1);
                hasher.write_u64(x as u64);
            }
            HashKey::Float(bits) => {
                hasher.write_u32(2);
                hasher.write_u64(bits);
            }
            HashKey::Rational(num, den) => {
                hasher.write_u32(3);
                hasher.write_u64(num as u64);
                hasher.write_u64(den as u64);
            }
        }
    }

    fn composite(&mut self, block: BlockRef, kind: HeapKind, depth: u32) -> u32 {
        let key = (block.addr(), depth);
        if let Some(&digest) = self.memo.get(&key) {
            return digest;
        }

        let mut hasher = Hasher::new(self.seed);
        match kind {
            HeapKind::Record => {
                hasher.write_u32(block.u32_at(RECORD_MODULE_OFFSET));
                hasher.write_u32(block.u32_at(RECORD_TYPE_OFFSET));
            }
            HeapKind::Adt => {
                hasher.write_u32(block.u32_at(ADT_MODULE_OFFSET));
                hasher.write_u32(block.u32_at(ADT_TYPE_OFFSET));
                hasher.write_u32(block.u32_at(ADT_VARIANT_OFFSET));
            }
            _ => {}
        }
        hasher.write_u32(block.field_count() as u32);
        for field in block.fields() {
            self.word(&mut hasher, field, depth + 1);
        }

        let digest = hasher.finish();
        self.memo.insert(key, digest);
        digest
    }
}
