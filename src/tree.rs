//! # Tree Crypto Engine
//!
//! Encrypts or decrypts every leaf beneath one subtree root and maintains a
//! single MAC over the plaintext leaves, stored under [`MAC_KEY`] at that
//! root.
//!
//! ## Traversal order
//!
//! Depth first. Object keys are visited in sorted order and array elements
//! in index order. The encrypting and decrypting passes may run in different
//! processes and must feed the accumulator identically. Document objects are
//! already key-ordered maps; keys are still sorted explicitly so the MAC
//! does not depend on which map type `serde_json` is built with.
//!
//! ## Failure behaviour
//!
//! Each pass builds the transformed subtree beside the original and swaps it
//! in only after every leaf (and, when decrypting, the MAC) has been
//! processed. A failed call leaves the document exactly as it was.

use crate::codec::{decode_leaf, encode_leaf, open_leaf, seal_leaf, Leaf};
use crate::envelope::{LeafDecryptor, LeafEncryptor};
use crate::error::{KeycloakError, Result};
use crate::mac::{Accumulator, MacLabel};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};
use tracing::debug;

/// Reserved key holding the encrypted integrity digest.
pub const MAC_KEY: &str = "__mac__";

/// Encrypt every leaf under `root` and attach the MAC, using the default
/// label. Returns the number of leaves encrypted.
pub fn encrypt_subtree<E>(root: &mut Value, encryptor: &E) -> Result<usize>
where
    E: LeafEncryptor + ?Sized,
{
    encrypt_subtree_with_label(root, encryptor, &MacLabel::default())
}

/// Decrypt every leaf under `root` and verify the MAC, using the default
/// label. Returns the number of leaves decrypted.
pub fn decrypt_subtree<D>(root: &mut Value, decryptor: &D) -> Result<usize>
where
    D: LeafDecryptor + ?Sized,
{
    decrypt_subtree_with_label(root, decryptor, &MacLabel::default())
}

pub fn encrypt_subtree_with_label<E>(
    root: &mut Value,
    encryptor: &E,
    label: &MacLabel,
) -> Result<usize>
where
    E: LeafEncryptor + ?Sized,
{
    let object = subtree_object(root)?;
    if object.contains_key(MAC_KEY) {
        return Err(KeycloakError::InvalidSubtree(
            "subtree is already encrypted".into(),
        ));
    }

    let mut pass = SealPass {
        encryptor,
        accumulator: Accumulator::new(label)?,
        leaves: 0,
    };
    let mut sealed = pass.seal_object(object)?;

    let SealPass {
        accumulator, leaves, ..
    } = pass;
    let digest = encryptor.encrypt(&accumulator.finalize())?;
    sealed.insert(MAC_KEY.to_string(), Value::String(STANDARD.encode(digest)));

    *root = Value::Object(sealed);
    debug!(leaves, "encrypted subtree");
    Ok(leaves)
}

pub fn decrypt_subtree_with_label<D>(
    root: &mut Value,
    decryptor: &D,
    label: &MacLabel,
) -> Result<usize>
where
    D: LeafDecryptor + ?Sized,
{
    let object = subtree_object(root)?;
    let stored = object.get(MAC_KEY).ok_or(KeycloakError::MissingMac)?;
    let sealed_digest = stored
        .as_str()
        .and_then(|mac| STANDARD.decode(mac).ok())
        .ok_or(KeycloakError::InvalidMac)?;

    let mut pass = OpenPass {
        decryptor,
        accumulator: Accumulator::new(label)?,
        leaves: 0,
    };
    let opened = pass.open_object(object, Some(MAC_KEY))?;

    let OpenPass {
        accumulator, leaves, ..
    } = pass;
    let digest = decryptor.decrypt(&sealed_digest)?;
    accumulator.verify(&digest)?;

    *root = Value::Object(opened);
    debug!(leaves, "decrypted subtree");
    Ok(leaves)
}

/// Whether `root` currently carries a MAC, i.e. was encrypted and not yet
/// decrypted.
pub fn is_encrypted(root: &Value) -> bool {
    root.as_object()
        .is_some_and(|object| object.contains_key(MAC_KEY))
}

fn subtree_object(root: &Value) -> Result<&Map<String, Value>> {
    root.as_object()
        .ok_or_else(|| KeycloakError::InvalidSubtree("subtree root must be an object".into()))
}

fn sorted_keys<'a>(object: &'a Map<String, Value>, skip: Option<&str>) -> Vec<&'a String> {
    let mut keys: Vec<&String> = object
        .keys()
        .filter(|key| Some(key.as_str()) != skip)
        .collect();
    keys.sort();
    keys
}

struct SealPass<'a, E: ?Sized> {
    encryptor: &'a E,
    accumulator: Accumulator,
    leaves: usize,
}

impl<E> SealPass<'_, E>
where
    E: LeafEncryptor + ?Sized,
{
    fn seal(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::Object(object) => self.seal_object(object).map(Value::Object),
            Value::Array(items) => items
                .iter()
                .map(|item| self.seal(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            leaf => {
                let leaf = Leaf::from_value(leaf)?;
                let (tag, payload) = encode_leaf(&leaf);
                self.accumulator.update(&payload);
                self.leaves += 1;
                seal_leaf(tag, &payload, self.encryptor).map(Value::String)
            }
        }
    }

    fn seal_object(&mut self, object: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut sealed = Map::new();
        for key in sorted_keys(object, None) {
            sealed.insert(key.clone(), self.seal(&object[key])?);
        }
        Ok(sealed)
    }
}

struct OpenPass<'a, D: ?Sized> {
    decryptor: &'a D,
    accumulator: Accumulator,
    leaves: usize,
}

impl<D> OpenPass<'_, D>
where
    D: LeafDecryptor + ?Sized,
{
    fn open(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::Object(object) => self.open_object(object, None).map(Value::Object),
            Value::Array(items) => items
                .iter()
                .map(|item| self.open(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::String(sealed) => {
                let (tag, payload) = open_leaf(sealed, self.decryptor)?;
                self.accumulator.update(&payload);
                self.leaves += 1;
                decode_leaf(tag, &payload)?.into_value()
            }
            Value::Number(_) => Err(KeycloakError::UnsupportedType(
                "number found where an encrypted leaf was expected".into(),
            )),
            Value::Bool(_) => Err(KeycloakError::UnsupportedType("boolean".into())),
            Value::Null => Err(KeycloakError::UnsupportedType("null".into())),
        }
    }

    fn open_object(
        &mut self,
        object: &Map<String, Value>,
        skip: Option<&str>,
    ) -> Result<Map<String, Value>> {
        let mut opened = Map::new();
        for key in sorted_keys(object, skip) {
            opened.insert(key.clone(), self.open(&object[key])?);
        }
        Ok(opened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn passthrough(bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    #[test]
    fn encrypt_replaces_leaves_and_adds_mac() {
        let mut doc = json!({ "a": "hunter2", "b": 42, "nested": { "c": [1.5, "x"] } });

        let leaves = encrypt_subtree(&mut doc, &passthrough).unwrap();

        assert_eq!(leaves, 5);
        assert!(doc[MAC_KEY].is_string());
        assert!(doc["a"].is_string());
        assert_ne!(doc["a"], json!("hunter2"));
        assert!(doc["b"].is_string());
        assert!(doc["nested"]["c"].as_array().unwrap().iter().all(Value::is_string));
        assert!(is_encrypted(&doc));
    }

    #[test]
    fn round_trip_restores_document() {
        let original = json!({ "a": "hunter2", "b": 42, "list": [3.5, -1, "z"] });
        let mut doc = original.clone();

        encrypt_subtree(&mut doc, &passthrough).unwrap();
        decrypt_subtree(&mut doc, &passthrough).unwrap();

        assert_eq!(doc, original);
        assert!(!is_encrypted(&doc));
    }

    #[test]
    fn leaves_are_visited_depth_first() {
        let seen = RefCell::new(Vec::new());
        let recorder = |bytes: &[u8]| -> Result<Vec<u8>> {
            seen.borrow_mut().push(bytes.to_vec());
            Ok(bytes.to_vec())
        };

        // Object keys come back sorted from the map itself; what this checks
        // is the depth-first walk and that arrays keep index order.
        let mut doc = json!({ "zeta": "z", "alpha": "a", "mid": ["m0", "m1"] });
        encrypt_subtree(&mut doc, &recorder).unwrap();

        let order: Vec<Vec<u8>> = seen.borrow().clone();
        // leaves carry their type tag; the last call seals the digest
        assert_eq!(order[0], b"\0a");
        assert_eq!(order[1], b"\0m0");
        assert_eq!(order[2], b"\0m1");
        assert_eq!(order[3], b"\0z");
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn sorted_keys_skips_the_mac() {
        let object = json!({ "b": 1, MAC_KEY: "m", "a": 2 });
        let keys = sorted_keys(object.as_object().unwrap(), Some(MAC_KEY));
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn booleans_fail_and_leave_document_untouched() {
        let original = json!({ "a": "secret", "flag": true });
        let mut doc = original.clone();

        assert!(matches!(
            encrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::UnsupportedType(_))
        ));
        assert_eq!(doc, original);
    }

    #[test]
    fn nulls_fail() {
        let mut doc = json!({ "a": null });
        assert!(matches!(
            encrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::UnsupportedType(_))
        ));
    }

    #[test]
    fn non_object_root_is_invalid() {
        let mut doc = json!(["a", "b"]);
        assert!(matches!(
            encrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::InvalidSubtree(_))
        ));
    }

    #[test]
    fn encrypting_twice_is_rejected() {
        let mut doc = json!({ "a": "x" });
        encrypt_subtree(&mut doc, &passthrough).unwrap();
        assert!(matches!(
            encrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::InvalidSubtree(_))
        ));
    }

    #[test]
    fn missing_mac_is_reported() {
        let mut doc = json!({ "a": "x" });
        assert!(matches!(
            decrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::MissingMac)
        ));
    }

    #[test]
    fn undecodable_mac_is_invalid() {
        for mac in [json!("%%% not base64"), json!(17)] {
            let mut doc = json!({ "a": "x" });
            encrypt_subtree(&mut doc, &passthrough).unwrap();
            doc[MAC_KEY] = mac;
            assert!(matches!(
                decrypt_subtree(&mut doc, &passthrough),
                Err(KeycloakError::InvalidMac)
            ));
        }
    }

    #[test]
    fn removed_leaf_breaks_integrity() {
        let mut doc = json!({ "a": "x", "b": "y" });
        encrypt_subtree(&mut doc, &passthrough).unwrap();
        doc.as_object_mut().unwrap().remove("b");

        let before = doc.clone();
        assert!(matches!(
            decrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::IntegrityMismatch)
        ));
        assert_eq!(doc, before);
    }

    #[test]
    fn swapped_leaves_break_integrity() {
        let mut doc = json!({ "a": "x", "b": "y" });
        encrypt_subtree(&mut doc, &passthrough).unwrap();

        let a = doc["a"].clone();
        doc["a"] = doc["b"].clone();
        doc["b"] = a;

        assert!(matches!(
            decrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::IntegrityMismatch)
        ));
    }

    #[test]
    fn different_label_breaks_integrity() {
        let mut doc = json!({ "a": "x" });
        encrypt_subtree_with_label(&mut doc, &passthrough, &MacLabel::new("staging")).unwrap();
        assert!(matches!(
            decrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::IntegrityMismatch)
        ));
    }

    #[test]
    fn plaintext_number_inside_encrypted_subtree_is_rejected() {
        let mut doc = json!({ "a": "x" });
        encrypt_subtree(&mut doc, &passthrough).unwrap();
        doc["b"] = json!(5);
        assert!(matches!(
            decrypt_subtree(&mut doc, &passthrough),
            Err(KeycloakError::UnsupportedType(_))
        ));
    }

    #[test]
    fn empty_object_round_trips() {
        let mut doc = json!({});
        assert_eq!(encrypt_subtree(&mut doc, &passthrough).unwrap(), 0);
        assert_eq!(doc.as_object().unwrap().len(), 1);
        assert_eq!(decrypt_subtree(&mut doc, &passthrough).unwrap(), 0);
        assert_eq!(doc, json!({}));
    }
}
