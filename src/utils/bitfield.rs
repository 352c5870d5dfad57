/// A `SIZE`-bit field living at bit `POSITION` of a 64-bit word.
///
/// Signed fields (`SIGN_EXTEND = true`) are sign-extended on decode, which is
/// how simple numbers get their two's-complement payload back out of a tagged
/// word.
pub struct BitField<const SIZE: usize, const POSITION: usize, const SIGN_EXTEND: bool>;

impl<const SIZE: usize, const POSITION: usize, const SIGN_EXTEND: bool>
    BitField<SIZE, POSITION, SIGN_EXTEND>
{
    pub const NEXT_BIT: usize = POSITION + SIZE;

    #[inline(always)]
    pub const fn mask() -> u64 {
        (1u64 << SIZE as u64) - 1
    }

    #[inline(always)]
    pub const fn mask_in_place() -> u64 {
        Self::mask() << POSITION as u64
    }

    #[inline(always)]
    pub const fn shift() -> usize {
        POSITION
    }

    #[inline(always)]
    pub const fn bitsize() -> usize {
        SIZE
    }

    /// Whether `value` survives an encode/decode round trip unchanged.
    #[inline(always)]
    pub const fn is_valid(value: u64) -> bool {
        Self::decode(Self::encode_unchecked(value)) == value
    }

    #[inline(always)]
    pub const fn decode(value: u64) -> u64 {
        if SIGN_EXTEND {
            ((value << (64 - Self::NEXT_BIT as u64)) as i64 >> (64 - SIZE as u64)) as u64
        } else {
            (value >> POSITION as u64) & Self::mask()
        }
    }

    #[inline(always)]
    pub fn encode(value: u64) -> u64 {
        debug_assert!(Self::is_valid(value));
        Self::encode_unchecked(value)
    }

    #[inline(always)]
    pub fn update(value: u64, original: u64) -> u64 {
        Self::encode(value) | (!Self::mask_in_place() & original)
    }

    #[inline(always)]
    const fn encode_unchecked(value: u64) -> u64 {
        (value & Self::mask()) << POSITION as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Low3 = BitField<3, 0, false>;
    type Payload = BitField<63, 1, true>;

    #[test]
    fn unsigned_field_round_trips() {
        assert_eq!(Low3::mask(), 0b111);
        assert_eq!(Low3::decode(0xff), 0b111);
        assert_eq!(Low3::update(0b110, 0xf8), 0xfe);
        assert!(!Low3::is_valid(8));
    }

    #[test]
    fn signed_field_sign_extends() {
        let encoded = Payload::encode(-5i64 as u64) | 1;
        assert_eq!(Payload::decode(encoded) as i64, -5);
        assert!(Payload::is_valid((-(1i64 << 62)) as u64));
        assert!(!Payload::is_valid((1u64 << 62) as u64));
    }
}
