//! Bencode decoding.
//!
//! Decodes directly to [`BencodeValue`], including integers — there is no
//! intermediate floating-point representation, so the common
//! "decode-as-float / re-encode-with-a-fractional-part" trap that plagues
//! torrent metadata parsers cannot occur here.
use super::{BencodeError, BencodeResult, BencodeValue};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use tracing::instrument;

type ByteStream<'a> = std::iter::Peekable<io::Bytes<Cursor<&'a [u8]>>>;

/// Decodes a single top-level bencode value, rejecting non-sorted
/// dictionary keys and any trailing bytes after the value.
///
/// # Arguments
/// * `bytes` - The full bencoded buffer; exactly one value is expected to
///   occupy it.
///
/// # Returns
/// * `Result<BencodeValue>` - The decoded value, or an error if the format
///   is malformed, a dictionary's keys aren't sorted, or bytes remain after
///   the value ends.
///
/// # Example
/// For input `b"i42e"`, this function returns `Ok(BencodeValue::Integer(42))`.
#[instrument(skip(bytes), level = "debug")]
pub fn decode(bytes: &[u8]) -> BencodeResult<BencodeValue> {
    decode_with_mode(bytes, true)
}

/// Decodes a single top-level bencode value, tolerating dictionaries whose
/// keys are not sorted. Used for tracker responses from implementations
/// that don't guarantee canonical key order; still rejects trailing bytes.
///
/// # Arguments
/// * `bytes` - The full bencoded buffer; exactly one value is expected to
///   occupy it.
///
/// # Returns
/// * `Result<BencodeValue>` - The decoded value, or an error if the format
///   is malformed or bytes remain after the value ends.
#[instrument(skip(bytes), level = "debug")]
pub fn decode_tolerant(bytes: &[u8]) -> BencodeResult<BencodeValue> {
    decode_with_mode(bytes, false)
}

/// Shared entry point for [`decode`] and [`decode_tolerant`]; `strict`
/// selects whether dictionary key ordering is enforced.
#[instrument(skip(bytes), level = "trace")]
fn decode_with_mode(bytes: &[u8], strict: bool) -> BencodeResult<BencodeValue> {
    let mut reader = Cursor::new(bytes).bytes().peekable();
    let value = decode_next(&mut reader, strict)?;
    if reader.peek().is_some() {
        let remaining = reader.count() + 1;
        return Err(BencodeError::TrailingGarbage(remaining));
    }
    Ok(value)
}

/// Dispatches on the next byte to decode whichever bencode type it opens:
/// a digit starts a string's length prefix, `i` an integer, `l` a list, `d`
/// a dictionary.
///
/// # Returns
/// * `Result<BencodeValue>` - The decoded value, or an error if the leading
///   byte doesn't open any known bencode type or the input ends unexpectedly.
#[instrument(skip(reader), level = "trace")]
fn decode_next(reader: &mut ByteStream, strict: bool) -> BencodeResult<BencodeValue> {
    let &first_byte = reader
        .peek()
        .ok_or(BencodeError::UnexpectedEOI)?
        .as_ref()
        .map_err(|e| BencodeError::Io(e.kind().into()))?;

    match first_byte {
        b'0'..=b'9' => decode_string(reader).map(BencodeValue::String),
        b'i' => decode_integer(reader).map(BencodeValue::Integer),
        b'l' => decode_list(reader, strict).map(BencodeValue::List),
        b'd' => decode_dict(reader, strict).map(BencodeValue::Dict),
        _ => Err(BencodeError::InvalidFormat(format!(
            "unexpected character: {}",
            first_byte as char
        ))),
    }
}

/// Reads bytes until the delimiter, returning them as a UTF-8 string. Used
/// only for the ASCII length/integer prefixes, never for the binary payload
/// of a byte-string.
///
/// # Arguments
/// * `reader` - A peekable byte iterator positioned just before the prefix.
/// * `delimiter` - The byte that marks the end of the prefix; consumed but
///   not included in the returned string.
///
/// # Returns
/// * `Result<String>` - The collected prefix, or an error if the input ends
///   unexpectedly or the bytes aren't valid UTF-8.
#[instrument(skip(reader), level = "trace")]
fn read_until(reader: &mut ByteStream, delimiter: u8) -> BencodeResult<String> {
    let mut buffer = Vec::new();
    loop {
        let &current_byte = reader
            .peek()
            .ok_or(BencodeError::UnexpectedEOI)?
            .as_ref()
            .map_err(|e| BencodeError::Io(e.kind().into()))?;

        if current_byte == delimiter {
            reader.next();
            break;
        }
        buffer.push(next_byte(reader)?);
    }
    String::from_utf8(buffer)
        .map_err(|e| BencodeError::InvalidFormat(format!("non-UTF8 prefix: {}", e)))
}

/// Pulls the next byte off the reader, translating end-of-input and I/O
/// errors into [`BencodeError`] variants.
#[instrument(skip(reader), level = "trace")]
fn next_byte(reader: &mut ByteStream) -> BencodeResult<u8> {
    reader
        .next()
        .ok_or(BencodeError::UnexpectedEOI)?
        .map_err(|e| BencodeError::Io(e.kind().into()))
}

/// Decodes a bencode byte-string in the format `<length>:<data>`.
///
/// # Arguments
/// * `reader` - A peekable byte iterator positioned at the length prefix.
///
/// # Returns
/// * `Result<Vec<u8>>` - The decoded bytes, or an error if the length
///   prefix is invalid or the input ends before `length` bytes are read.
///
/// # Example
/// For input `b"5:hello"`, this function returns `Ok(b"hello".to_vec())`.
#[instrument(skip(reader), level = "trace")]
fn decode_string(reader: &mut ByteStream) -> BencodeResult<Vec<u8>> {
    let length_str = read_until(reader, b':')?;
    let length = length_str
        .parse::<usize>()
        .map_err(|_| BencodeError::InvalidStringLength)?;

    let mut bytes = Vec::with_capacity(length);
    for _ in 0..length {
        bytes.push(next_byte(reader)?);
    }
    Ok(bytes)
}

/// Decodes a bencode integer in the format `i<number>e`.
///
/// Rejects leading zeros (except a bare `0`), a literal `-0`, and an empty
/// digit run between `i` and `e`.
///
/// # Arguments
/// * `reader` - A peekable byte iterator positioned at the leading `i`.
///
/// # Returns
/// * `Result<i64>` - The decoded integer, or an error if the format is
///   invalid or the value doesn't fit in an `i64`.
///
/// # Example
/// For input `b"i42e"`, this function returns `Ok(42)`.
#[instrument(skip(reader), level = "trace")]
fn decode_integer(reader: &mut ByteStream) -> BencodeResult<i64> {
    let first = next_byte(reader)?;
    if first != b'i' {
        return Err(BencodeError::InvalidFormat(
            "integer must start with 'i'".to_string(),
        ));
    }

    let num_str = read_until(reader, b'e')?;

    if num_str.is_empty() {
        return Err(BencodeError::InvalidInteger);
    }
    if num_str == "-0" {
        return Err(BencodeError::InvalidInteger);
    }
    let digits = num_str.strip_prefix('-').unwrap_or(&num_str);
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(BencodeError::InvalidInteger);
    }

    num_str.parse::<i64>().map_err(|_| BencodeError::InvalidInteger)
}

/// Decodes a bencode list in the format `l<items>e`, recursively decoding
/// each item via [`decode_next`].
///
/// # Arguments
/// * `reader` - A peekable byte iterator positioned at the leading `l`.
/// * `strict` - Whether nested dictionaries must have sorted keys.
///
/// # Returns
/// * `Result<Vec<BencodeValue>>` - The decoded items, or an error if the
///   format is invalid or any item fails to decode.
///
/// # Example
/// For input `b"li42e5:helloe"`, this function returns
/// `Ok(vec![Integer(42), String(b"hello".to_vec())])`.
#[instrument(skip(reader), level = "trace")]
fn decode_list(reader: &mut ByteStream, strict: bool) -> BencodeResult<Vec<BencodeValue>> {
    let first = next_byte(reader)?;
    if first != b'l' {
        return Err(BencodeError::InvalidFormat(
            "list must start with 'l'".to_string(),
        ));
    }

    let mut list = Vec::new();
    loop {
        let &current = reader
            .peek()
            .ok_or(BencodeError::UnexpectedEOI)?
            .as_ref()
            .map_err(|e| BencodeError::Io(e.kind().into()))?;
        if current == b'e' {
            reader.next();
            break;
        }
        list.push(decode_next(reader, strict)?);
    }
    Ok(list)
}

/// Decodes a bencode dictionary in the format `d<key><value>...e`.
///
/// Keys must themselves be bencode strings; in `strict` mode each key must
/// sort strictly after the previous one, matching the canonical-encoding
/// invariant [`super::encode`] produces.
///
/// # Arguments
/// * `reader` - A peekable byte iterator positioned at the leading `d`.
/// * `strict` - Whether to reject non-ascending key order.
///
/// # Returns
/// * `Result<BTreeMap<Vec<u8>, BencodeValue>>` - The decoded key-value
///   pairs, or an error if the format is invalid, a key isn't a string, or
///   (in strict mode) keys aren't sorted.
///
/// # Example
/// For input `b"d3:bar4:spam3:fooi42ee"`, this function returns a map with
/// `b"bar" => String(b"spam")` and `b"foo" => Integer(42)`.
#[instrument(skip(reader), level = "trace")]
fn decode_dict(
    reader: &mut ByteStream,
    strict: bool,
) -> BencodeResult<BTreeMap<Vec<u8>, BencodeValue>> {
    let first = next_byte(reader)?;
    if first != b'd' {
        return Err(BencodeError::InvalidFormat(
            "dictionary must start with 'd'".to_string(),
        ));
    }

    let mut dict = BTreeMap::new();
    let mut last_key: Option<Vec<u8>> = None;
    loop {
        let &current = reader
            .peek()
            .ok_or(BencodeError::UnexpectedEOI)?
            .as_ref()
            .map_err(|e| BencodeError::Io(e.kind().into()))?;
        if current == b'e' {
            reader.next();
            break;
        }

        let key = decode_string(reader)?;
        if strict {
            if let Some(prev) = &last_key {
                if key <= *prev {
                    return Err(BencodeError::NonSortedKeys);
                }
            }
        }
        last_key = Some(key.clone());

        let value = decode_next(reader, strict)?;
        dict.insert(key, value);
    }
    Ok(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_string() {
        assert_eq!(
            decode(b"5:hello").unwrap(),
            BencodeValue::String(b"hello".to_vec())
        );
    }

    #[test]
    fn decodes_integer() {
        assert_eq!(decode(b"i42e").unwrap(), BencodeValue::Integer(42));
        assert_eq!(decode(b"i-3e").unwrap(), BencodeValue::Integer(-3));
        assert_eq!(decode(b"i0e").unwrap(), BencodeValue::Integer(0));
    }

    #[test]
    fn rejects_leading_zero_integer() {
        assert!(decode(b"i04e").is_err());
        assert!(decode(b"i-0e").is_err());
    }

    #[test]
    fn decodes_list() {
        let v = decode(b"li42e5:helloe").unwrap();
        assert_eq!(
            v,
            BencodeValue::List(vec![
                BencodeValue::Integer(42),
                BencodeValue::String(b"hello".to_vec())
            ])
        );
    }

    #[test]
    fn decodes_sorted_dict() {
        let v = decode(b"d3:bar4:spam3:fooi42ee").unwrap();
        let dict = v.as_dict().unwrap();
        assert_eq!(dict.get(&b"bar".to_vec()).unwrap().as_str_bytes(), Some(&b"spam"[..]));
        assert_eq!(dict.get(&b"foo".to_vec()).unwrap().as_integer(), Some(42));
    }

    #[test]
    fn strict_mode_rejects_unsorted_keys() {
        let unsorted = b"d3:fooi42e3:bar4:spame";
        assert!(decode(unsorted).is_err());
        assert!(decode_tolerant(unsorted).is_ok());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(decode(b"i1eextra").is_err());
    }

    #[test]
    fn rejects_unexpected_eof() {
        assert!(decode(b"5:hi").is_err());
        assert!(decode(b"i42").is_err());
    }
}
