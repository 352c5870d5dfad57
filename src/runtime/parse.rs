//! Integer parsing with exact overflow detection.

use super::{
    error::{Expected, RuntimeError},
    factory::{make_adt, make_string},
    number::{decode, make_integer, Number},
    string::string_as_str,
    value::Value,
};
use crate::RtResult;

/// Module and type ids of the `Result` variant returned by [`parse_int`].
pub const RESULT_MODULE_ID: u32 = 0;
pub const RESULT_TYPE_ID: u32 = 1;
pub const RESULT_OK: u32 = 0;
pub const RESULT_ERR: u32 = 1;

/// Parses a signed 64-bit integer.
///
/// A leading `-` negates. A `0b`, `0o` or `0x` prefix (either case) selects
/// radix 2, 8 or 16 regardless of `radix`, provided at least one character
/// follows it. Underscores are skipped.
pub fn parse_int_str(input: &str, radix: i64) -> RtResult<i64> {
    if !(2..=36).contains(&radix) {
        return Err(RuntimeError::invalid_argument(format!(
            "radix {} outside 2..=36",
            radix
        )));
    }
    if input.is_empty() {
        return Err(RuntimeError::invalid_argument("empty string"));
    }

    let bytes = input.as_bytes();
    let mut radix = radix as u32;
    let mut offset = 0;
    let negative = bytes[0] == b'-';
    if negative {
        offset = 1;
    }

    if bytes.len() > offset + 2 && bytes[offset] == b'0' {
        let prefixed = match bytes[offset + 1] {
            b'b' | b'B' => Some(2),
            b'o' | b'O' => Some(8),
            b'x' | b'X' => Some(16),
            _ => None,
        };
        if let Some(r) = prefixed {
            radix = r;
            offset += 2;
        }
    }

    // Accumulate negatively so i64::MIN is reachable without overflow.
    let limit = i64::MIN;
    let multmin = limit / radix as i64;
    let mut value: i64 = 0;
    let mut digits = 0;

    for c in input[offset..].chars() {
        if c == '_' {
            continue;
        }
        let digit = c
            .to_digit(radix)
            .ok_or(RuntimeError::InvalidDigit { digit: c, radix })? as i64;

        if value < multmin {
            return Err(out_of_range(input));
        }
        value *= radix as i64;
        if value < limit + digit {
            return Err(out_of_range(input));
        }
        value -= digit;
        digits += 1;
    }

    if digits == 0 {
        return Err(RuntimeError::invalid_argument(format!("no digits in {:?}", input)));
    }

    if negative {
        Ok(value)
    } else if value == limit {
        Err(out_of_range(input))
    } else {
        Ok(-value)
    }
}

fn out_of_range(input: &str) -> RuntimeError {
    RuntimeError::overflow(format!("{:?} is out of the 64-bit integer range", input))
}

/// Parses `string` in `radix`, returning `Ok(number)` or `Err(message)` as a
/// variant value instead of failing.
pub fn parse_int(string: &Value, radix: &Value) -> Value {
    match parse_value(string, radix) {
        Ok(n) => make_adt(RESULT_MODULE_ID, RESULT_TYPE_ID, RESULT_OK, vec![make_integer(n)]),
        Err(e) => make_adt(
            RESULT_MODULE_ID,
            RESULT_TYPE_ID,
            RESULT_ERR,
            vec![make_string(&e.to_string())],
        ),
    }
}

fn parse_value(string: &Value, radix: &Value) -> RtResult<i64> {
    let radix = match decode(radix) {
        Some(Number::Simple(r) | Number::Int64(r)) => r,
        Some(Number::Int32(r)) => r as i64,
        _ => return Err(RuntimeError::wrong_type(Expected::Integer, radix.type_name())),
    };
    parse_int_str(string_as_str(string)?, radix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{
        composite::{adt_get, adt_variant},
        number::make_int32,
    };

    #[test]
    fn decimal() {
        assert_eq!(parse_int_str("123", 10), Ok(123));
        assert_eq!(parse_int_str("-42", 10), Ok(-42));
        assert_eq!(parse_int_str("0", 10), Ok(0));
        assert_eq!(parse_int_str("1_000_000", 10), Ok(1_000_000));
    }

    #[test]
    fn full_range() {
        assert_eq!(parse_int_str("-9223372036854775808", 10), Ok(i64::MIN));
        assert_eq!(parse_int_str("9223372036854775807", 10), Ok(i64::MAX));
        assert!(matches!(
            parse_int_str("9223372036854775808", 10),
            Err(RuntimeError::Overflow(_))
        ));
        assert!(matches!(
            parse_int_str("-9223372036854775809", 10),
            Err(RuntimeError::Overflow(_))
        ));
        assert!(parse_int_str("99999999999999999999", 10).is_err());
        assert_eq!(parse_int_str("-8000000000000000", 16), Ok(i64::MIN));
    }

    #[test]
    fn prefixes_override_the_radix() {
        assert_eq!(parse_int_str("0xFF", 16), Ok(255));
        assert_eq!(parse_int_str("0xff", 10), Ok(255));
        assert_eq!(parse_int_str("-0b101", 10), Ok(-5));
        assert_eq!(parse_int_str("0O17", 2), Ok(15));
        // Too short to carry a prefix.
        assert_eq!(parse_int_str("0b", 16), Ok(0xb));
        assert_eq!(
            parse_int_str("0x", 10),
            Err(RuntimeError::InvalidDigit { digit: 'x', radix: 10 })
        );
    }

    #[test]
    fn bad_input() {
        assert!(matches!(parse_int_str("", 10), Err(RuntimeError::InvalidArgument(_))));
        assert!(matches!(parse_int_str("12", 1), Err(RuntimeError::InvalidArgument(_))));
        assert!(matches!(parse_int_str("12", 37), Err(RuntimeError::InvalidArgument(_))));
        assert!(matches!(parse_int_str("-", 10), Err(RuntimeError::InvalidArgument(_))));
        assert!(matches!(parse_int_str("__", 10), Err(RuntimeError::InvalidArgument(_))));
        assert_eq!(
            parse_int_str("12a", 10),
            Err(RuntimeError::InvalidDigit { digit: 'a', radix: 10 })
        );
        assert_eq!(
            parse_int_str("+1", 10),
            Err(RuntimeError::InvalidDigit { digit: '+', radix: 10 })
        );
        assert_eq!(parse_int_str("zz", 36), Ok(35 * 36 + 35));
    }

    #[test]
    fn result_variants() {
        let ok = parse_int(&make_string("-17"), &Value::simple(10).unwrap());
        assert_eq!(adt_variant(&ok), Ok((RESULT_MODULE_ID, RESULT_TYPE_ID, RESULT_OK)));
        assert_eq!(adt_get(&ok, 0).unwrap().word(), make_integer(-17).word());

        let big = parse_int(&make_string("9223372036854775807"), &make_int32(10));
        assert_eq!(decode(&adt_get(&big, 0).unwrap()), Some(Number::Int64(i64::MAX)));

        let err = parse_int(&make_string(""), &Value::simple(10).unwrap());
        assert_eq!(adt_variant(&err), Ok((RESULT_MODULE_ID, RESULT_TYPE_ID, RESULT_ERR)));
        let message = adt_get(&err, 0).unwrap();
        assert_eq!(string_as_str(&message), Ok("InvalidArgument: empty string"));

        let wrong = parse_int(&make_string("1"), &Value::void());
        assert_eq!(adt_variant(&wrong).unwrap().2, RESULT_ERR);
    }
}
