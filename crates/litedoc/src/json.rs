//! Conversion between documents and `serde_json::Value`.
//!
//! Byte strings become `data:` URIs and blob references become
//! `{"@type": "blob", ...}` objects. Reading JSON back recognises the blob
//! shape; data URIs stay plain strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use litedoc_pack::{decode, read_blob_ref, read_scalar, BlobRef, Scalar, Tag};
use serde_json::{Map, Number, Value};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Arena, Body, Node, NodeId, Owner};
use crate::slot::Slot;
use crate::value::{Blob, Native};

pub const BLOB_TYPE_KEY: &str = "@type";
pub const BLOB_TYPE: &str = "blob";
const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

pub fn bytes_to_json(bytes: &[u8]) -> Value {
    Value::String(format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(bytes)))
}

pub fn blob_to_json(blob: &BlobRef) -> Value {
    let mut map = Map::new();
    map.insert(BLOB_TYPE_KEY.into(), Value::String(BLOB_TYPE.into()));
    map.insert(BlobRef::DIGEST_KEY.into(), Value::String(blob.digest.clone()));
    map.insert(BlobRef::LENGTH_KEY.into(), Value::from(blob.length));
    if let Some(content_type) = &blob.content_type {
        map.insert(BlobRef::CONTENT_TYPE_KEY.into(), Value::String(content_type.clone()));
    }
    Value::Object(map)
}

/// Reads the `{"@type": "blob", ...}` shape. Anything else is `None`.
pub fn blob_from_json(map: &Map<String, Value>) -> Option<BlobRef> {
    if map.get(BLOB_TYPE_KEY)?.as_str()? != BLOB_TYPE {
        return None;
    }
    let digest = map.get(BlobRef::DIGEST_KEY)?.as_str()?;
    let length = map.get(BlobRef::LENGTH_KEY)?.as_u64()?;
    let reference = BlobRef::new(digest, length);
    Some(match map.get(BlobRef::CONTENT_TYPE_KEY).and_then(Value::as_str) {
        Some(ct) => reference.with_content_type(ct),
        None => reference,
    })
}

fn scalar_to_json(scalar: Scalar<'_>) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(b),
        Scalar::Int(i) => Value::from(i),
        Scalar::UInt(u) => Value::from(u),
        Scalar::Float(f) => float_to_json(f),
        Scalar::Text(s) => Value::String(s.to_owned()),
        Scalar::Bytes(b) => bytes_to_json(b),
    }
}

/// Read-only walk over the tree; never materializes anything.
pub(crate) struct JsonWriter<'a> {
    pub source: &'a [u8],
    pub arena: &'a Arena,
}

impl JsonWriter<'_> {
    pub fn slot(&self, slot: &Slot) -> Result<Value> {
        match slot {
            Slot::Unloaded(range) => self.encoded(range.start),
            Slot::Loaded { value, .. } => self.native(value),
        }
    }

    pub fn native(&self, value: &Native) -> Result<Value> {
        Ok(match value {
            Native::Null => Value::Null,
            Native::Bool(b) => Value::Bool(*b),
            Native::Int(i) => Value::from(*i),
            Native::UInt(u) => Value::from(*u),
            Native::Float(f) => float_to_json(*f),
            Native::String(s) => Value::String(s.to_string()),
            Native::Bytes(b) => bytes_to_json(b),
            Native::Blob(blob) => blob_to_json(blob.reference()),
            Native::Array(id) => Value::Array(self.items(*id)?),
            Native::Dictionary(id) => Value::Object(self.entries(*id)?),
        })
    }

    pub fn items(&self, id: NodeId) -> Result<Vec<Value>> {
        match &self.arena.get(id)?.body {
            Body::Array(slots) => slots.iter().map(|s| self.slot(s)).collect(),
            Body::Dict(_) => Err(Error::NotAnArray),
        }
    }

    pub fn entries(&self, id: NodeId) -> Result<Map<String, Value>> {
        match &self.arena.get(id)?.body {
            Body::Dict(map) => map
                .iter()
                .map(|(k, s)| -> Result<(String, Value)> { Ok((k.clone(), self.slot(s)?)) })
                .collect(),
            Body::Array(_) => Err(Error::NotADictionary),
        }
    }

    fn encoded(&self, offset: usize) -> Result<Value> {
        let item = decode(self.source, offset)?;
        Ok(match item.tag {
            Tag::Array => Value::Array(
                item.children
                    .iter()
                    .map(|c| self.encoded(c.start))
                    .collect::<Result<_>>()?,
            ),
            Tag::Map => {
                let mut map = Map::with_capacity(item.count());
                for pair in item.children.chunks(2) {
                    let key = match self.encoded(pair[0].start)? {
                        Value::String(key) => key,
                        _ => {
                            return Err(litedoc_pack::PackError::NonTextKey {
                                offset: pair[0].start,
                            }
                            .into())
                        }
                    };
                    map.insert(key, self.encoded(pair[1].start)?);
                }
                Value::Object(map)
            }
            Tag::Blob => blob_to_json(&read_blob_ref(self.source, &item)?),
            _ => scalar_to_json(read_scalar(self.source, &item)?),
        })
    }
}

impl Document {
    pub(crate) fn json_writer(&self) -> JsonWriter<'_> {
        JsonWriter {
            source: &self.source,
            arena: &self.arena,
        }
    }

    /// The whole document as JSON. Reads unloaded slots straight from the
    /// encoded buffer without caching them.
    pub fn to_json(&self) -> Result<Value> {
        self.json_writer().slot(&self.root)
    }

    /// Builds a detached value from JSON. Arrays and objects become new
    /// collections that can then be assigned into the tree.
    pub fn import_json(&mut self, json: &Value) -> Result<Native> {
        self.build(json, 1)
    }

    fn build(&mut self, json: &Value, depth: usize) -> Result<Native> {
        let too_deep = Error::TooDeep {
            max_depth: self.config.max_depth,
        };
        Ok(match json {
            Value::Null => Native::Null,
            Value::Bool(b) => Native::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Native::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Native::UInt(u)
                } else {
                    Native::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => Native::from(s.as_str()),
            Value::Array(items) => {
                if depth > self.config.max_depth {
                    return Err(too_deep);
                }
                let id = self.new_detached(Body::Array(Vec::with_capacity(items.len())), depth);
                for item in items {
                    let value = self.build_child(id, item, depth)?;
                    if let Ok(Node {
                        body: Body::Array(slots),
                        ..
                    }) = self.arena.get_mut(id)
                    {
                        slots.push(Slot::assigned(value));
                    }
                }
                Native::Array(id)
            }
            Value::Object(map) => {
                if let Some(blob) = blob_from_json(map) {
                    return Ok(Native::Blob(Blob::new(blob)));
                }
                if depth > self.config.max_depth {
                    return Err(too_deep);
                }
                let id = self.new_detached(Body::Dict(Default::default()), depth);
                for (key, item) in map {
                    let value = self.build_child(id, item, depth)?;
                    if let Ok(Node {
                        body: Body::Dict(entries),
                        ..
                    }) = self.arena.get_mut(id)
                    {
                        entries.insert(key.clone(), Slot::assigned(value));
                    }
                }
                Native::Dictionary(id)
            }
        })
    }

    /// Builds one element of `parent`, releasing `parent` if that fails.
    fn build_child(&mut self, parent: NodeId, json: &Value, depth: usize) -> Result<Native> {
        match self.build(json, depth + 1) {
            Ok(value) => {
                if let Some(child) = value.node_id() {
                    self.arena.get_mut(child)?.owner = Owner::Node(parent);
                }
                Ok(value)
            }
            Err(e) => {
                self.release(parent);
                Err(e)
            }
        }
    }

    /// A document whose root is built from `json`.
    pub fn from_json(json: &Value) -> Result<Self> {
        let mut doc = Document::new();
        let value = doc.import_json(json)?;
        doc.set_root(value)?;
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blob_json_shape_round_trips() {
        let blob = BlobRef::new("sha1-abc", 3).with_content_type("text/plain");
        let json = blob_to_json(&blob);
        assert_eq!(
            json,
            json!({"@type": "blob", "digest": "sha1-abc", "length": 3, "content_type": "text/plain"})
        );
        assert_eq!(blob_from_json(json.as_object().unwrap()), Some(blob));
    }

    #[test]
    fn objects_without_blob_type_are_not_blobs() {
        let map = json!({"digest": "sha1-abc", "length": 3});
        assert_eq!(blob_from_json(map.as_object().unwrap()), None);
    }

    #[test]
    fn bytes_become_data_uri() {
        assert_eq!(
            bytes_to_json(b"hi"),
            json!("data:application/octet-stream;base64,aGk=")
        );
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(float_to_json(f64::INFINITY), Value::Null);
        assert_eq!(float_to_json(1.5), json!(1.5));
    }
}
