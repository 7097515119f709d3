//! # Leaf Codec
//!
//! Typed byte encoding of the two supported scalar kinds, plus the framing
//! that turns an encrypted leaf into a document string.
//!
//! ## Payload encoding
//!
//! | Leaf   | Tag | Payload                                   |
//! |--------|-----|-------------------------------------------|
//! | string | `0` | raw UTF-8 bytes                           |
//! | number | `1` | IEEE-754 bit pattern, 8 bytes, big-endian |
//!
//! ## Encrypted leaf framing
//!
//! ```text
//! base64( tag || envelope( tag || payload ) )
//! ```
//!
//! The tag is written twice. The copy inside the envelope is authenticated
//! and is the one used for decoding; the outer copy lets a reader tell the
//! leaf kind without a key and must agree with the inner one.

use crate::envelope::{LeafDecryptor, LeafEncryptor};
use crate::error::{KeycloakError, Result};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Number, Value};

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0; // 2^53

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    String = 0,
    Number = 1,
}

impl TryFrom<u8> for TypeTag {
    type Error = KeycloakError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(TypeTag::String),
            1 => Ok(TypeTag::Number),
            other => Err(KeycloakError::UnsupportedType(format!("type tag {other}"))),
        }
    }
}

/// A single encryptable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Text(String),
    Number(f64),
}

impl Leaf {
    /// Extract a leaf from a document value. Containers, booleans and null
    /// are not leaves.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(Leaf::Text(text.clone())),
            Value::Number(number) => match number.as_f64() {
                Some(number) if number.is_finite() => Ok(Leaf::Number(number)),
                _ => Err(KeycloakError::UnsupportedType("non-finite number".into())),
            },
            Value::Bool(_) => Err(KeycloakError::UnsupportedType("boolean".into())),
            Value::Null => Err(KeycloakError::UnsupportedType("null".into())),
            Value::Array(_) | Value::Object(_) => {
                Err(KeycloakError::UnsupportedType("container is not a leaf".into()))
            }
        }
    }

    /// Convert back into a document value.
    ///
    /// Integral numbers inside the exactly-representable range come back as
    /// JSON integers so `42` stays `42`. Everything else, `-0.0` included,
    /// keeps its exact f64 bit pattern.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Leaf::Text(text) => Ok(Value::String(text)),
            Leaf::Number(number) => {
                let negative_zero = number == 0.0 && number.is_sign_negative();
                if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER && !negative_zero {
                    return Ok(Value::from(number as i64));
                }
                Number::from_f64(number)
                    .map(Value::Number)
                    .ok_or_else(|| KeycloakError::UnsupportedType("non-finite number".into()))
            }
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Leaf::Text(_) => TypeTag::String,
            Leaf::Number(_) => TypeTag::Number,
        }
    }
}

/// Encode a leaf into its tag and payload bytes.
pub fn encode_leaf(leaf: &Leaf) -> (TypeTag, Vec<u8>) {
    let payload = match leaf {
        Leaf::Text(text) => text.as_bytes().to_vec(),
        Leaf::Number(number) => number.to_bits().to_be_bytes().to_vec(),
    };
    (leaf.tag(), payload)
}

/// Decode payload bytes written by [`encode_leaf`].
pub fn decode_leaf(tag: u8, bytes: &[u8]) -> Result<Leaf> {
    match TypeTag::try_from(tag)? {
        TypeTag::String => String::from_utf8(bytes.to_vec())
            .map(Leaf::Text)
            .map_err(|_| KeycloakError::UnsupportedType("string payload is not UTF-8".into())),
        TypeTag::Number => {
            let bits: [u8; 8] = bytes.try_into().map_err(|_| {
                KeycloakError::UnsupportedType("number payload is not 8 bytes".into())
            })?;
            Ok(Leaf::Number(f64::from_bits(u64::from_be_bytes(bits))))
        }
    }
}

/// Encrypt one encoded leaf and frame it as a document string.
pub fn seal_leaf<E>(tag: TypeTag, payload: &[u8], encryptor: &E) -> Result<String>
where
    E: LeafEncryptor + ?Sized,
{
    let mut plaintext = Vec::with_capacity(1 + payload.len());
    plaintext.push(tag as u8);
    plaintext.extend_from_slice(payload);

    let envelope = encryptor.encrypt(&plaintext)?;

    let mut framed = Vec::with_capacity(1 + envelope.len());
    framed.push(tag as u8);
    framed.extend_from_slice(&envelope);
    Ok(STANDARD.encode(framed))
}

/// Reverse [`seal_leaf`], returning the authenticated tag and payload.
///
/// A string that is not base64 or is too short to hold a tag cannot be
/// authenticated. An outer tag that disagrees with the inner one means the
/// frame was altered.
pub fn open_leaf<D>(sealed: &str, decryptor: &D) -> Result<(u8, Vec<u8>)>
where
    D: LeafDecryptor + ?Sized,
{
    let framed = STANDARD
        .decode(sealed)
        .map_err(|_| KeycloakError::Authentication)?;
    let (&outer_tag, envelope) = framed
        .split_first()
        .ok_or(KeycloakError::Authentication)?;

    let mut plaintext = decryptor.decrypt(envelope)?;
    if plaintext.is_empty() {
        return Err(KeycloakError::Authentication);
    }

    let inner_tag = plaintext.remove(0);
    if inner_tag != outer_tag {
        return Err(KeycloakError::IntegrityMismatch);
    }
    Ok((inner_tag, plaintext))
}
