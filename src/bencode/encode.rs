//! Bencode encoding. Dictionary keys are always emitted in ascending byte
//! order because [`BencodeValue::Dict`] is a `BTreeMap`; there is no separate
//! sort pass.
use super::{BencodeResult, BencodeValue};
use std::io::Write;
use tracing::instrument;

/// Encodes a byte-string as `<length>:<data>`.
///
/// # Arguments
/// * `writer` - The destination to write the encoded bytes to.
/// * `s` - The raw bytes to encode.
///
/// # Returns
/// * `Result<()>` - `Ok(())`, or an I/O error if `writer` fails.
#[instrument(skip(writer, s), level = "trace")]
fn encode_string<W: Write>(writer: &mut W, s: &[u8]) -> BencodeResult<()> {
    write!(writer, "{}:", s.len())?;
    writer.write_all(s)?;
    Ok(())
}

/// Encodes an integer as `i<number>e`.
///
/// # Arguments
/// * `writer` - The destination to write the encoded bytes to.
/// * `i` - The integer value to encode.
///
/// # Returns
/// * `Result<()>` - `Ok(())`, or an I/O error if `writer` fails.
#[instrument(skip(writer), level = "trace")]
fn encode_integer<W: Write>(writer: &mut W, i: i64) -> BencodeResult<()> {
    write!(writer, "i{}e", i)?;
    Ok(())
}

/// Encodes a list as `l<item>...e`, recursively encoding each item via
/// [`encode_value`].
///
/// # Arguments
/// * `writer` - The destination to write the encoded bytes to.
/// * `list` - The items to encode, in order.
///
/// # Returns
/// * `Result<()>` - `Ok(())`, or an I/O error if `writer` fails.
///
/// # Example
/// `[Integer(42), String(b"x".to_vec())]` encodes to `b"li42e1:xe"`.
#[instrument(skip(writer, list), level = "trace")]
fn encode_list<W: Write>(writer: &mut W, list: &[BencodeValue]) -> BencodeResult<()> {
    writer.write_all(b"l")?;
    for item in list {
        encode_value(writer, item)?;
    }
    writer.write_all(b"e")?;
    Ok(())
}

/// Encodes a dictionary as `d<key><value>...e`. Because
/// [`BencodeValue::Dict`] is a `BTreeMap`, iterating it already yields keys
/// in ascending byte order, so the canonical-encoding invariant holds
/// without a separate sort pass.
///
/// # Arguments
/// * `writer` - The destination to write the encoded bytes to.
/// * `dict` - The key-value pairs to encode.
///
/// # Returns
/// * `Result<()>` - `Ok(())`, or an I/O error if `writer` fails.
#[instrument(skip(writer, dict), level = "trace")]
fn encode_dict<W: Write>(
    writer: &mut W,
    dict: &std::collections::BTreeMap<Vec<u8>, BencodeValue>,
) -> BencodeResult<()> {
    writer.write_all(b"d")?;
    for (key, value) in dict {
        encode_string(writer, key)?;
        encode_value(writer, value)?;
    }
    writer.write_all(b"e")?;
    Ok(())
}

/// Dispatches on `value`'s variant to the matching `encode_*` helper.
///
/// # Arguments
/// * `writer` - The destination to write the encoded bytes to.
/// * `value` - The value to encode.
///
/// # Returns
/// * `Result<()>` - `Ok(())`, or an I/O error if `writer` fails.
#[instrument(skip(writer, value), level = "trace")]
fn encode_value<W: Write>(writer: &mut W, value: &BencodeValue) -> BencodeResult<()> {
    match value {
        BencodeValue::String(s) => encode_string(writer, s),
        BencodeValue::Integer(i) => encode_integer(writer, *i),
        BencodeValue::List(list) => encode_list(writer, list),
        BencodeValue::Dict(dict) => encode_dict(writer, dict),
    }
}

/// Encodes a value to its canonical bencode byte representation.
///
/// # Arguments
/// * `value` - The value to encode.
///
/// # Returns
/// * `Vec<u8>` - The encoded bytes.
///
/// # Example
/// `BencodeValue::Integer(42)` encodes to `b"i42e".to_vec()`.
#[instrument(skip(value), level = "debug")]
pub fn encode(value: &BencodeValue) -> Vec<u8> {
    let mut buf = Vec::new();
    // Writing to a Vec<u8> never fails; the Result is kept so the internal
    // helpers can share a signature with writers that can fail.
    encode_value(&mut buf, value).expect("encoding into a Vec<u8> cannot fail");
    buf
}
