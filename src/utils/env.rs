//! Helpers for reading runtime knobs out of the process environment.

fn read_float_and_factor_from_env(var: &str) -> Option<(f64, u64)> {
    let value = std::env::var(var).ok()?;
    let value = value.trim();

    if value.is_empty() {
        return None;
    }

    let (digits, factor) = match value.as_bytes()[value.len() - 1] {
        b'g' | b'G' => (&value[..value.len() - 1], 1024 * 1024 * 1024),
        b'm' | b'M' => (&value[..value.len() - 1], 1024 * 1024),
        b'k' | b'K' => (&value[..value.len() - 1], 1024),
        _ => (value, 1),
    };

    match digits.parse::<f64>() {
        Ok(x) => Some((x, factor)),
        _ => None,
    }
}

/// Reads an unsigned integer, accepting `0x` hex and `k`/`m`/`g` suffixes.
pub fn read_uint_from_env(var: &str) -> Option<u64> {
    if let Ok(value) = std::env::var(var) {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            return u64::from_str_radix(hex, 16).ok();
        }
    }

    let (value, factor) = read_float_and_factor_from_env(var)?;

    if value < 0.0 || !value.is_finite() {
        return None;
    }

    Some(value as u64 * factor)
}

pub fn read_bool_from_env(var: &str) -> Option<bool> {
    let value = std::env::var(var).ok()?;

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
