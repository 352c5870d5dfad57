pub mod bitfield;
pub mod env;

/// Rounds `x` up to the next multiple of `align` (a power of two).
#[inline(always)]
pub const fn round_up(x: usize, align: usize) -> usize {
    (x + align - 1) & !(align - 1)
}
