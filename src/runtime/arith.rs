//! Fixed-width arithmetic on boxed numbers.
//!
//! Every operation reads boxed operands of one declared width and returns a
//! freshly boxed result of that width, or a boolean for comparisons.
//! Integer arithmetic wraps; shift and rotate counts are taken modulo the
//! width.

use num_traits::{Float, PrimInt, Signed};

use super::{
    error::RuntimeError,
    number::{
        expect_float32, expect_float64, expect_int32, expect_int64, make_float32, make_float64,
        make_int32, make_int64,
    },
    value::Value,
};
use crate::RtResult;

fn signed_div<T: PrimInt + Signed>(x: T, y: T) -> RtResult<T> {
    if y.is_zero() {
        return Err(RuntimeError::DivideByZero);
    }
    x.checked_div(&y)
        .ok_or_else(|| RuntimeError::overflow("integer division overflow"))
}

/// Remainder with the sign of the dividend.
fn signed_rem<T: PrimInt + Signed>(x: T, y: T) -> RtResult<T> {
    if y.is_zero() {
        return Err(RuntimeError::ModuloByZero);
    }
    // MIN % -1 traps on most targets; the answer is always zero.
    if y == -T::one() {
        return Ok(T::zero());
    }
    Ok(x % y)
}

/// Remainder with the sign of the divisor.
fn signed_modulo<T: PrimInt + Signed>(x: T, y: T) -> RtResult<T> {
    let r = signed_rem(x, y)?;
    if !r.is_zero() && r.is_negative() != y.is_negative() {
        Ok(r + y)
    } else {
        Ok(r)
    }
}

/// IEEE 754-2019 `minimum`: NaN propagates and -0 orders below +0.
fn float_min<F: Float>(x: F, y: F) -> F {
    if x.is_nan() || y.is_nan() {
        F::nan()
    } else if x == y {
        if x.is_sign_negative() {
            x
        } else {
            y
        }
    } else {
        x.min(y)
    }
}

fn float_max<F: Float>(x: F, y: F) -> F {
    if x.is_nan() || y.is_nan() {
        F::nan()
    } else if x == y {
        if x.is_sign_positive() {
            x
        } else {
            y
        }
    } else {
        x.max(y)
    }
}

macro_rules! int_binary {
    ($name: ident, $t: ty, $make: ident, $expect: ident, $($op: ident => |$x: ident, $y: ident| $body: expr),*) => {
        paste::paste! {
            $(
                pub fn [<$name _ $op>](x: &Value, y: &Value) -> RtResult<Value> {
                    let $x: $t = $expect(x)?;
                    let $y: $t = $expect(y)?;
                    Ok($make($body))
                }
            )*
        }
    };
}

macro_rules! define_int_ops {
    ($(($name: ident, $t: ty, $u: ty, $make: ident, $expect: ident)),*) => {
        paste::paste! {
            $(
                int_binary! {
                    $name, $t, $make, $expect,
                    add => |x, y| x.wrapping_add(y),
                    sub => |x, y| x.wrapping_sub(y),
                    mul => |x, y| x.wrapping_mul(y),
                    land => |x, y| x & y,
                    lor => |x, y| x | y,
                    lxor => |x, y| x ^ y,
                    shl => |x, y| x.wrapping_shl(y as u32),
                    shr => |x, y| x.wrapping_shr(y as u32),
                    shr_u => |x, y| (x as $u).wrapping_shr(y as u32) as $t,
                    rotl => |x, y| x.rotate_left(y as u32 % <$t>::BITS),
                    rotr => |x, y| x.rotate_right(y as u32 % <$t>::BITS)
                }

                pub fn [<$name _div>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make(signed_div($expect(x)?, $expect(y)?)?))
                }

                pub fn [<$name _div_u>](x: &Value, y: &Value) -> RtResult<Value> {
                    let (x, y) = ($expect(x)? as $u, $expect(y)? as $u);
                    match x.checked_div(y) {
                        Some(q) => Ok($make(q as $t)),
                        None => Err(RuntimeError::DivideByZero),
                    }
                }

                pub fn [<$name _rem>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make(signed_rem($expect(x)?, $expect(y)?)?))
                }

                pub fn [<$name _rem_u>](x: &Value, y: &Value) -> RtResult<Value> {
                    let (x, y) = ($expect(x)? as $u, $expect(y)? as $u);
                    match x.checked_rem(y) {
                        Some(r) => Ok($make(r as $t)),
                        None => Err(RuntimeError::ModuloByZero),
                    }
                }

                pub fn [<$name _modulo>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make(signed_modulo($expect(x)?, $expect(y)?)?))
                }

                pub fn [<$name _lnot>](x: &Value) -> RtResult<Value> {
                    Ok($make(!$expect(x)?))
                }

                pub fn [<$name _clz>](x: &Value) -> RtResult<Value> {
                    Ok($make($expect(x)?.leading_zeros() as $t))
                }

                pub fn [<$name _ctz>](x: &Value) -> RtResult<Value> {
                    Ok($make($expect(x)?.trailing_zeros() as $t))
                }

                pub fn [<$name _popcnt>](x: &Value) -> RtResult<Value> {
                    Ok($make($expect(x)?.count_ones() as $t))
                }

                define_int_ops!(@compare $name, $t, $expect, eq ==, ne !=, lt <, gt >, lte <=, gte >=);
                define_int_ops!(@compare $name, $u, $expect, lt_u <, gt_u >, lte_u <=, gte_u >=);
            )*
        }
    };

    (@compare $name: ident, $t: ty, $expect: ident, $($op: ident $cmp: tt),*) => {
        paste::paste! {
            $(
                pub fn [<$name _ $op>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok(Value::bool(($expect(x)? as $t) $cmp ($expect(y)? as $t)))
                }
            )*
        }
    };
}

define_int_ops! {
    (int32, i32, u32, make_int32, expect_int32),
    (int64, i64, u64, make_int64, expect_int64)
}

macro_rules! define_float_ops {
    ($(($name: ident, $t: ty, $make: ident, $expect: ident)),*) => {
        paste::paste! {
            $(
                pub fn [<$name _add>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make($expect(x)? + $expect(y)?))
                }

                pub fn [<$name _sub>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make($expect(x)? - $expect(y)?))
                }

                pub fn [<$name _mul>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make($expect(x)? * $expect(y)?))
                }

                /// IEEE division; a zero divisor yields an infinity or NaN.
                pub fn [<$name _div>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make($expect(x)? / $expect(y)?))
                }

                pub fn [<$name _min>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make(float_min::<$t>($expect(x)?, $expect(y)?)))
                }

                pub fn [<$name _max>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok($make(float_max::<$t>($expect(x)?, $expect(y)?)))
                }

                pub fn [<$name _neg>](x: &Value) -> RtResult<Value> {
                    Ok($make(-$expect(x)?))
                }

                pub fn [<$name _abs>](x: &Value) -> RtResult<Value> {
                    Ok($make($expect(x)?.abs()))
                }

                define_float_ops!(@compare $name, $expect, eq ==, ne !=, lt <, gt >, lte <=, gte >=);
            )*
        }
    };

    (@compare $name: ident, $expect: ident, $($op: ident $cmp: tt),*) => {
        paste::paste! {
            $(
                pub fn [<$name _ $op>](x: &Value, y: &Value) -> RtResult<Value> {
                    Ok(Value::bool($expect(x)? $cmp $expect(y)?))
                }
            )*
        }
    };
}

define_float_ops! {
    (float32, f32, make_float32, expect_float32),
    (float64, f64, make_float64, expect_float64)
}
