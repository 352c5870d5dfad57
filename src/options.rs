use once_cell::sync::Lazy;

use crate::utils::env::{read_bool_from_env, read_uint_from_env};

/// Recursion bound used by the structural hash when `CORVID_HASH_DEPTH` is unset.
pub const DEFAULT_HASH_DEPTH: u32 = 31;
/// The hash walk recurses once per level, so configured depths are capped.
pub const MAX_HASH_DEPTH: u32 = 1024;

pub struct RuntimeOptions {
    /// Fixed seed for the structural hash. `None` draws one from the OS.
    pub hash_seed: Option<u32>,
    pub hash_depth: u32,
    pub trace_heap: bool,
}

impl RuntimeOptions {
    pub fn new() -> Self {
        RuntimeOptions {
            hash_seed: None,
            hash_depth: DEFAULT_HASH_DEPTH,
            trace_heap: false,
        }
    }

    pub fn set_hash_seed(&mut self, seed: u32) {
        self.hash_seed = Some(seed);
    }

    pub fn set_hash_depth(&mut self, depth: u32) {
        self.hash_depth = depth;
    }

    pub fn from_env() -> Self {
        let mut options = Self::new();

        if let Some(seed) = read_uint_from_env("CORVID_HASH_SEED").and_then(checked_seed) {
            options.set_hash_seed(seed);
        }

        if let Some(depth) = read_uint_from_env("CORVID_HASH_DEPTH") {
            options.set_hash_depth(checked_depth(depth));
        }

        options.trace_heap = read_bool_from_env("CORVID_TRACE_HEAP").unwrap_or(false);
        options
    }
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn checked_seed(raw: u64) -> Option<u32> {
    match u32::try_from(raw) {
        Ok(seed) => Some(seed),
        Err(_) => {
            log::warn!("CORVID_HASH_SEED {:#x} does not fit in 32 bits, ignoring it", raw);
            None
        }
    }
}

fn checked_depth(raw: u64) -> u32 {
    if raw > MAX_HASH_DEPTH as u64 {
        log::warn!("CORVID_HASH_DEPTH {} capped at {}", raw, MAX_HASH_DEPTH);
        return MAX_HASH_DEPTH;
    }
    raw as u32
}

static OPTIONS: Lazy<RuntimeOptions> = Lazy::new(RuntimeOptions::from_env);

/// Process-wide options, read from the environment on first use.
pub fn options() -> &'static RuntimeOptions {
    &OPTIONS
}
