//! # Fractional Indexing
//!
//! Sortable string keys that allow inserting between any two siblings without
//! touching the keys of the others.
//!
//! A key is an *integer part* followed by an optional *fraction*. The head
//! character of the integer part encodes its length (`a`..`z` for positive
//! lengths 2..27, `Z`..`A` for negative ones), so plain byte-wise comparison of
//! keys orders them correctly. Fractions never end in the zero digit, which is
//! what keeps a midpoint available between any two distinct keys.
//!
//! ```text
//! key_between(None, None)             = "a0"
//! key_between(Some("a0"), None)       = "a1"
//! key_between(None, Some("a0"))       = "Zz"
//! key_between(Some("a0"), Some("a1")) = "a0V"
//! ```

use thiserror::Error;

const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ZERO: u8 = b'0';
const LAST_DIGIT: u8 = b'z';

/// The smallest representable integer part. It cannot be decremented, so it is
/// only ever used as a prefix for fractions.
const SMALLEST_INTEGER: &[u8] = b"A00000000000000000000000000";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("invalid order key: {0:?}")]
    InvalidKey(String),

    #[error("order key has a trailing zero: {0:?}")]
    TrailingZero(String),

    #[error("order keys out of order: {0:?} >= {1:?}")]
    OutOfOrder(String, String),

    #[error("order key space exhausted")]
    Exhausted,
}

/// Generate a key strictly between `a` and `b`.
///
/// `None` stands for "no bound" on that side. Both bounds must be valid keys
/// and `a < b` when both are given.
pub fn key_between(a: Option<&str>, b: Option<&str>) -> Result<String, IndexError> {
    let a = a.map(str::as_bytes);
    let b = b.map(str::as_bytes);

    if let Some(a) = a {
        validate_key(a)?;
    }
    if let Some(b) = b {
        validate_key(b)?;
    }

    let key = match (a, b) {
        (None, None) => vec![b'a', ZERO],
        (None, Some(b)) => {
            let ib = integer_part(b)?;
            let fb = &b[ib.len()..];
            if ib == SMALLEST_INTEGER {
                concat(ib, &midpoint(&[], Some(fb))?)
            } else if ib.len() < b.len() {
                ib.to_vec()
            } else {
                decrement_integer(ib)?.ok_or(IndexError::Exhausted)?
            }
        }
        (Some(a), None) => {
            let ia = integer_part(a)?;
            let fa = &a[ia.len()..];
            match increment_integer(ia)? {
                Some(i) => i,
                None => concat(ia, &midpoint(fa, None)?),
            }
        }
        (Some(a), Some(b)) => {
            if a >= b {
                return Err(IndexError::OutOfOrder(to_string(a), to_string(b)));
            }
            let ia = integer_part(a)?;
            let fa = &a[ia.len()..];
            let ib = integer_part(b)?;
            let fb = &b[ib.len()..];
            if ia == ib {
                concat(ia, &midpoint(fa, Some(fb))?)
            } else {
                let i = increment_integer(ia)?.ok_or(IndexError::Exhausted)?;
                if i.as_slice() < b {
                    i
                } else {
                    concat(ia, &midpoint(fa, None)?)
                }
            }
        }
    };

    Ok(to_string(&key))
}

/// Generate `n` increasing keys, all after `a`.
pub fn keys_after(a: Option<&str>, n: usize) -> Result<Vec<String>, IndexError> {
    let mut keys: Vec<String> = Vec::with_capacity(n);
    let mut last = a.map(str::to_string);
    for _ in 0..n {
        let key = key_between(last.as_deref(), None)?;
        last = Some(key.clone());
        keys.push(key);
    }
    Ok(keys)
}

/// Check that `key` is a well-formed order key.
pub fn validate_key(key: &[u8]) -> Result<(), IndexError> {
    if key == SMALLEST_INTEGER {
        return Err(IndexError::InvalidKey(to_string(key)));
    }
    if key.iter().any(|c| digit_value(*c).is_none()) {
        return Err(IndexError::InvalidKey(to_string(key)));
    }
    let i = integer_part(key)?;
    if key.len() > i.len() && key.last() == Some(&ZERO) {
        return Err(IndexError::TrailingZero(to_string(key)));
    }
    Ok(())
}

fn midpoint(a: &[u8], b: Option<&[u8]>) -> Result<Vec<u8>, IndexError> {
    if let Some(b) = b {
        if a >= b {
            return Err(IndexError::OutOfOrder(to_string(a), to_string(b)));
        }
    }
    if a.last() == Some(&ZERO) || b.and_then(|b| b.last()) == Some(&ZERO) {
        return Err(IndexError::TrailingZero(to_string(a)));
    }

    if let Some(b) = b {
        // Shared prefix, with `a` padded by zeros.
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(ZERO) == b[n] {
            n += 1;
        }
        if n > 0 {
            let rest_a = a.get(n..).unwrap_or(&[]);
            return Ok(concat(&b[..n], &midpoint(rest_a, Some(&b[n..]))?));
        }
    }

    let digit_a = match a.first() {
        Some(c) => digit_of(*c)?,
        None => 0,
    };
    let digit_b = match b.and_then(|b| b.first()) {
        Some(c) => digit_of(*c)?,
        None => DIGITS.len(),
    };

    if digit_b > digit_a + 1 {
        // Math.round(0.5 * (a + b)) on non-negative integers
        let mid = (digit_a + digit_b + 1) / 2;
        return Ok(vec![DIGITS[mid]]);
    }

    if let Some(b) = b {
        if b.len() > 1 {
            return Ok(vec![b[0]]);
        }
    }

    let rest_a = a.get(1..).unwrap_or(&[]);
    Ok(concat(&[DIGITS[digit_a]], &midpoint(rest_a, None)?))
}

fn integer_length(head: u8) -> Result<usize, IndexError> {
    match head {
        b'a'..=b'z' => Ok((head - b'a') as usize + 2),
        b'A'..=b'Z' => Ok((b'Z' - head) as usize + 2),
        _ => Err(IndexError::InvalidKey(to_string(&[head]))),
    }
}

fn integer_part(key: &[u8]) -> Result<&[u8], IndexError> {
    let head = *key
        .first()
        .ok_or_else(|| IndexError::InvalidKey(String::new()))?;
    let len = integer_length(head)?;
    if len > key.len() {
        return Err(IndexError::InvalidKey(to_string(key)));
    }
    Ok(&key[..len])
}

fn validate_integer(int: &[u8]) -> Result<(), IndexError> {
    match int.first() {
        Some(head) if integer_length(*head)? == int.len() => Ok(()),
        _ => Err(IndexError::InvalidKey(to_string(int))),
    }
}

fn increment_integer(x: &[u8]) -> Result<Option<Vec<u8>>, IndexError> {
    validate_integer(x)?;
    let head = x[0];
    let mut digs = x[1..].to_vec();

    let mut carry = true;
    for d in digs.iter_mut().rev() {
        let next = digit_of(*d)? + 1;
        if next == DIGITS.len() {
            *d = ZERO;
        } else {
            *d = DIGITS[next];
            carry = false;
            break;
        }
    }

    if !carry {
        return Ok(Some(concat(&[head], &digs)));
    }
    if head == b'Z' {
        return Ok(Some(vec![b'a', ZERO]));
    }
    if head == b'z' {
        return Ok(None);
    }
    let h = head + 1;
    if h > b'a' {
        digs.push(ZERO);
    } else {
        digs.pop();
    }
    Ok(Some(concat(&[h], &digs)))
}

fn decrement_integer(x: &[u8]) -> Result<Option<Vec<u8>>, IndexError> {
    validate_integer(x)?;
    let head = x[0];
    let mut digs = x[1..].to_vec();

    let mut borrow = true;
    for d in digs.iter_mut().rev() {
        let value = digit_of(*d)?;
        if value == 0 {
            *d = LAST_DIGIT;
        } else {
            *d = DIGITS[value - 1];
            borrow = false;
            break;
        }
    }

    if !borrow {
        return Ok(Some(concat(&[head], &digs)));
    }
    if head == b'a' {
        return Ok(Some(vec![b'Z', LAST_DIGIT]));
    }
    if head == b'A' {
        return Ok(None);
    }
    let h = head - 1;
    if h < b'Z' {
        digs.push(LAST_DIGIT);
    } else {
        digs.pop();
    }
    Ok(Some(concat(&[h], &digs)))
}

fn digit_value(c: u8) -> Option<usize> {
    DIGITS.iter().position(|d| *d == c)
}

fn digit_of(c: u8) -> Result<usize, IndexError> {
    digit_value(c).ok_or_else(|| IndexError::InvalidKey(to_string(&[c])))
}

fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

fn to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}
