//! Boxed numbers and cross-width numeric semantics.

use std::cmp::Ordering;

use super::{
    error::{Expected, RuntimeError},
    heap,
    object::*,
    value::{Value, Word},
};
use crate::RtResult;

/// A decoded view of any numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Simple(i64),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Normalised: gcd 1, positive denominator greater than one.
    Rational(i64, i64),
}

/// What a number contributes to the structural hash. Numbers that compare
/// equal share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKey {
    Integer(i64),
    Float(u64),
    Rational(i64, i64),
}

enum Class {
    Integer(i64),
    Float(f64),
    Ratio(i64, i64),
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

impl Number {
    fn class(self) -> Class {
        match self {
            Number::Simple(x) | Number::Int64(x) => Class::Integer(x),
            Number::Int32(x) => Class::Integer(x as i64),
            Number::Float32(x) => Class::Float(x as f64),
            Number::Float64(x) => Class::Float(x),
            Number::Rational(n, d) => Class::Ratio(n, d),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self.class(), Class::Integer(_))
    }

    pub fn is_float(self) -> bool {
        matches!(self, Number::Float32(_) | Number::Float64(_))
    }

    pub fn hash_key(self) -> HashKey {
        match self.class() {
            Class::Integer(x) => HashKey::Integer(x),
            Class::Float(f) => match float_as_integer(f) {
                Some(x) => HashKey::Integer(x),
                None => HashKey::Float(f.to_bits()),
            },
            Class::Ratio(n, d) => HashKey::Rational(n, d),
        }
    }
}

/// The integer `f` denotes exactly, if any.
fn float_as_integer(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= -TWO_POW_63 && f < TWO_POW_63 {
        Some(f as i64)
    } else {
        None
    }
}

fn compare_integer_float(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f >= TWO_POW_63 {
        return Some(Ordering::Less);
    }
    if f < -TWO_POW_63 {
        return Some(Ordering::Greater);
    }

    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0f64.partial_cmp(&(f - whole)),
        ordering => Some(ordering),
    }
}

/// Numeric equality across the tower. Integers compare by value whatever
/// their width, an integral float equals the matching integer, NaN equals
/// nothing.
pub fn number_equal(x: Number, y: Number) -> bool {
    match (x.class(), y.class()) {
        (Class::Integer(a), Class::Integer(b)) => a == b,
        (Class::Float(a), Class::Float(b)) => a == b,
        (Class::Integer(i), Class::Float(f)) | (Class::Float(f), Class::Integer(i)) => {
            float_as_integer(f) == Some(i)
        }
        (Class::Ratio(a, b), Class::Ratio(c, d)) => a == c && b == d,
        _ => false,
    }
}

pub fn number_compare(x: Number, y: Number) -> Option<Ordering> {
    match (x.class(), y.class()) {
        (Class::Integer(a), Class::Integer(b)) => Some(a.cmp(&b)),
        (Class::Float(a), Class::Float(b)) => a.partial_cmp(&b),
        (Class::Integer(i), Class::Float(f)) => compare_integer_float(i, f),
        (Class::Float(f), Class::Integer(i)) => compare_integer_float(i, f).map(Ordering::reverse),
        (Class::Ratio(a, b), Class::Ratio(c, d)) => {
            Some((a as i128 * d as i128).cmp(&(c as i128 * b as i128)))
        }
        (Class::Ratio(n, d), Class::Integer(i)) => Some((n as i128).cmp(&(i as i128 * d as i128))),
        (Class::Integer(i), Class::Ratio(n, d)) => Some((i as i128 * d as i128).cmp(&(n as i128))),
        (Class::Ratio(n, d), Class::Float(f)) => (n as f64 / d as f64).partial_cmp(&f),
        (Class::Float(f), Class::Ratio(n, d)) => f.partial_cmp(&(n as f64 / d as f64)),
    }
}

#[inline]
pub fn is_number_word(word: Word) -> bool {
    word.is_simple_number() || word.heap_kind() == Some(HeapKind::BoxedNum)
}

pub fn decode_word(word: Word) -> Option<Number> {
    if word.is_simple_number() {
        return Some(Number::Simple(word.get_simple()));
    }

    if word.heap_kind() != Some(HeapKind::BoxedNum) {
        return None;
    }

    let block = word.block();
    let payload = block.u64_at(NUM_PAYLOAD_OFFSET);
    Some(match BoxedNumTag::from_tag(block.u32_at(NUM_SUBTYPE_OFFSET))? {
        BoxedNumTag::Int32 => Number::Int32(payload as u32 as i32),
        BoxedNumTag::Int64 => Number::Int64(payload as i64),
        BoxedNumTag::Float32 => Number::Float32(f32::from_bits(payload as u32)),
        BoxedNumTag::Float64 => Number::Float64(f64::from_bits(payload)),
        BoxedNumTag::Rational => {
            Number::Rational(payload as i64, block.u64_at(RATIONAL_DENOMINATOR_OFFSET) as i64)
        }
    })
}

pub fn decode(value: &Value) -> Option<Number> {
    decode_word(value.word())
}

pub fn expect_number(value: &Value) -> RtResult<Number> {
    decode(value).ok_or_else(|| RuntimeError::wrong_type(Expected::Number, value.type_name()))
}

fn make_boxed(tag: BoxedNumTag, payload: u64) -> Value {
    let block = heap::allocate(HeapKind::BoxedNum, BOXED_NUM_SIZE);
    block.set_u32_at(NUM_SUBTYPE_OFFSET, tag as u32);
    block.set_u64_at(NUM_PAYLOAD_OFFSET, payload);
    unsafe { Value::from_word(Word::from_block(block)) }
}

pub fn make_int32(x: i32) -> Value {
    make_boxed(BoxedNumTag::Int32, x as u32 as u64)
}

pub fn make_int64(x: i64) -> Value {
    make_boxed(BoxedNumTag::Int64, x as u64)
}

pub fn make_float32(x: f32) -> Value {
    make_boxed(BoxedNumTag::Float32, x.to_bits() as u64)
}

pub fn make_float64(x: f64) -> Value {
    make_boxed(BoxedNumTag::Float64, x.to_bits())
}

/// A simple number when `x` fits in 63 bits, a boxed Int64 otherwise.
pub fn make_integer(x: i64) -> Value {
    Value::simple(x).unwrap_or_else(|| make_int64(x))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// `numerator / denominator` in lowest terms; a whole result collapses to an
/// integer.
pub fn make_rational(numerator: i64, denominator: i64) -> RtResult<Value> {
    if denominator == 0 {
        return Err(RuntimeError::DivideByZero);
    }

    let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()) as i128;
    let mut num = numerator as i128 / divisor;
    let mut den = denominator as i128 / divisor;
    if den < 0 {
        num = -num;
        den = -den;
    }

    let num = i64::try_from(num).map_err(|_| RuntimeError::overflow("rational numerator"))?;
    let den = i64::try_from(den).map_err(|_| RuntimeError::overflow("rational denominator"))?;

    if den == 1 {
        return Ok(make_integer(num));
    }

    let block = heap::allocate(HeapKind::BoxedNum, RATIONAL_SIZE);
    block.set_u32_at(NUM_SUBTYPE_OFFSET, BoxedNumTag::Rational as u32);
    block.set_u64_at(NUM_PAYLOAD_OFFSET, num as u64);
    block.set_u64_at(RATIONAL_DENOMINATOR_OFFSET, den as u64);
    Ok(unsafe { Value::from_word(Word::from_block(block)) })
}

macro_rules! define_expect {
    ($($name: ident => $variant: ident: $prim: ty),*) => {
        $(
            #[inline]
            pub fn $name(value: &Value) -> RtResult<$prim> {
                match decode(value) {
                    Some(Number::$variant(x)) => Ok(x),
                    _ => Err(RuntimeError::wrong_type(Expected::$variant, value.type_name())),
                }
            }
        )*
    };
}

define_expect! {
    expect_int32 => Int32: i32,
    expect_int64 => Int64: i64,
    expect_float32 => Float32: f32,
    expect_float64 => Float64: f64
}

/// Numeric equality of two values; false when either is not a number.
pub fn numbers_equal(x: &Value, y: &Value) -> bool {
    match (decode(x), decode(y)) {
        (Some(a), Some(b)) => number_equal(a, b),
        _ => false,
    }
}

pub fn compare(x: &Value, y: &Value) -> RtResult<Option<Ordering>> {
    Ok(number_compare(expect_number(x)?, expect_number(y)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_numbers_decode() {
        assert_eq!(decode(&make_int32(-3)), Some(Number::Int32(-3)));
        assert_eq!(decode(&make_int64(i64::MIN)), Some(Number::Int64(i64::MIN)));
        assert_eq!(decode(&make_float32(1.5)), Some(Number::Float32(1.5)));
        assert_eq!(decode(&make_float64(-0.25)), Some(Number::Float64(-0.25)));
        assert_eq!(decode(&Value::simple(9).unwrap()), Some(Number::Simple(9)));
        assert_eq!(decode(&Value::bool(true)), None);
    }

    #[test]
    fn boxed_layout() {
        let x = make_int64(0x0102_0304_0506_0708);
        let block = x.word().block();
        assert_eq!(block.u32_at(KIND_OFFSET), HeapKind::BoxedNum as u32);
        assert_eq!(block.u32_at(NUM_SUBTYPE_OFFSET), BoxedNumTag::Int64 as u32);
        assert_eq!(unsafe { *block.as_ptr().add(NUM_PAYLOAD_OFFSET) }, 0x08);
    }

    #[test]
    fn integers_compare_by_value_across_widths() {
        assert!(numbers_equal(&make_int32(7), &make_int64(7)));
        assert!(numbers_equal(&make_int64(7), &Value::simple(7).unwrap()));
        assert!(!numbers_equal(&make_int32(7), &make_int32(8)));
        assert_eq!(make_integer(5).word(), Value::simple(5).unwrap().word());
        assert_eq!(decode(&make_integer(i64::MAX)), Some(Number::Int64(i64::MAX)));
    }

    #[test]
    fn float_semantics() {
        assert!(!numbers_equal(&make_float64(f64::NAN), &make_float64(f64::NAN)));
        assert!(numbers_equal(&make_float64(2.0), &make_int32(2)));
        assert!(numbers_equal(&make_float32(0.5), &make_float64(0.5)));
        assert!(numbers_equal(&make_float64(0.0), &make_float64(-0.0)));
        assert!(!numbers_equal(&make_float64(2.5), &make_int32(2)));
        assert!(!numbers_equal(&make_float64(TWO_POW_63), &make_int64(i64::MAX)));
    }

    #[test]
    fn equal_numbers_share_a_hash_key() {
        let keys = [
            Number::Simple(3).hash_key(),
            Number::Int32(3).hash_key(),
            Number::Int64(3).hash_key(),
            Number::Float32(3.0).hash_key(),
            Number::Float64(3.0).hash_key(),
        ];
        assert!(keys.iter().all(|k| *k == HashKey::Integer(3)));
        assert_eq!(Number::Float64(-0.0).hash_key(), HashKey::Integer(0));
        assert_eq!(Number::Float64(0.5).hash_key(), HashKey::Float(0.5f64.to_bits()));
    }

    #[test]
    fn rationals_normalise() {
        assert_eq!(decode(&make_rational(2, -4).unwrap()), Some(Number::Rational(-1, 2)));
        assert_eq!(make_rational(6, 3).unwrap().word(), Value::simple(2).unwrap().word());
        assert_eq!(make_rational(1, 0).unwrap_err(), RuntimeError::DivideByZero);
        assert!(numbers_equal(&make_rational(1, 3).unwrap(), &make_rational(2, 6).unwrap()));
        assert!(make_rational(i64::MIN, -1).is_err());
    }

    #[test]
    fn ordering() {
        let cmp = |a, b| number_compare(a, b);
        assert_eq!(cmp(Number::Int32(1), Number::Float64(1.5)), Some(Ordering::Less));
        assert_eq!(cmp(Number::Float64(-0.5), Number::Int64(-1)), Some(Ordering::Greater));
        assert_eq!(cmp(Number::Int64(i64::MAX), Number::Float64(TWO_POW_63)), Some(Ordering::Less));
        assert_eq!(cmp(Number::Rational(1, 3), Number::Rational(1, 2)), Some(Ordering::Less));
        assert_eq!(cmp(Number::Rational(7, 2), Number::Simple(3)), Some(Ordering::Greater));
        assert_eq!(cmp(Number::Float64(f64::NAN), Number::Int32(0)), None);
        assert_eq!(
            compare(&make_int32(2), &Value::simple(2).unwrap()),
            Ok(Some(Ordering::Equal))
        );
        assert!(compare(&Value::void(), &make_int32(1)).is_err());
    }

    #[test]
    fn expect_checks_the_exact_width() {
        assert_eq!(expect_int32(&make_int32(4)), Ok(4));
        assert_eq!(
            expect_int32(&make_int64(4)),
            Err(RuntimeError::wrong_type(Expected::Int32, "Number"))
        );
        assert_eq!(expect_float64(&make_float64(1.0)), Ok(1.0));
    }
}
