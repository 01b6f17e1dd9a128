//! Key-addressed accessor over a dictionary node.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litedoc_pack::Encoder;
use serde_json::{Map, Value};

use crate::array::Array;
use crate::convert;
use crate::document::Document;
use crate::encode::EncodeReport;
use crate::error::{EncodeError, Result};
use crate::loader::Location;
use crate::node::{Body, NodeId};
use crate::slot::SlotState;
use crate::value::{Blob, Native, Number};

/// Borrowed handle to one dictionary of a [`Document`].
///
/// Keys keep their insertion order. Reading an absent key is not an error:
/// getters return `None` or the zero value.
#[derive(Debug)]
pub struct Dictionary<'d> {
    doc: &'d mut Document,
    id: NodeId,
}

impl<'d> Dictionary<'d> {
    pub(crate) fn new(doc: &'d mut Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&mut self) -> &mut Document {
        &mut *self.doc
    }

    pub fn count(&self) -> Result<usize> {
        self.doc.node_len(self.id)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        match &self.doc.arena.get(self.id)?.body {
            Body::Dict(map) => Ok(map.keys().cloned().collect()),
            Body::Array(_) => Ok(Vec::new()),
        }
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.doc.slot(Location::Key(self.id, key))?.is_some())
    }

    /// The native value under `key`, decoded on first access.
    pub fn get_object(&mut self, key: &str) -> Result<Option<Native>> {
        self.doc.load(Location::Key(self.id, key))
    }

    /// Alias of [`Dictionary::get_object`].
    pub fn get_value(&mut self, key: &str) -> Result<Option<Native>> {
        self.get_object(key)
    }

    pub fn get_string(&mut self, key: &str) -> Result<Option<Arc<str>>> {
        Ok(match self.get_object(key)? {
            Some(Native::String(s)) => Some(s),
            _ => None,
        })
    }

    pub fn get_number(&mut self, key: &str) -> Result<Option<Number>> {
        Ok(convert::as_number(self.get_object(key)?.as_ref()))
    }

    pub fn get_int(&mut self, key: &str) -> Result<i32> {
        Ok(convert::as_int(self.get_object(key)?.as_ref()))
    }

    pub fn get_long(&mut self, key: &str) -> Result<i64> {
        Ok(convert::as_long(self.get_object(key)?.as_ref()))
    }

    pub fn get_float(&mut self, key: &str) -> Result<f32> {
        Ok(convert::as_float(self.get_object(key)?.as_ref()))
    }

    pub fn get_double(&mut self, key: &str) -> Result<f64> {
        Ok(convert::as_double(self.get_object(key)?.as_ref()))
    }

    pub fn get_boolean(&mut self, key: &str) -> Result<bool> {
        Ok(convert::as_bool(self.get_object(key)?.as_ref()))
    }

    pub fn get_blob(&mut self, key: &str) -> Result<Option<Blob>> {
        Ok(match self.get_object(key)? {
            Some(Native::Blob(b)) => Some(b),
            _ => None,
        })
    }

    pub fn get_date(&mut self, key: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(convert::as_date(self.get_object(key)?.as_ref()))
    }

    pub fn get_array(&mut self, key: &str) -> Result<Option<Array<'_>>> {
        match self.get_object(key)? {
            Some(Native::Array(id)) => self.doc.array(id).map(Some),
            _ => Ok(None),
        }
    }

    pub fn get_dictionary(&mut self, key: &str) -> Result<Option<Dictionary<'_>>> {
        match self.get_object(key)? {
            Some(Native::Dictionary(id)) => self.doc.dictionary(id).map(Some),
            _ => Ok(None),
        }
    }

    /// Materialization state of the slot under `key`, `None` if absent.
    pub fn slot_state(&self, key: &str) -> Result<Option<SlotState>> {
        Ok(self.doc.slot(Location::Key(self.id, key))?.map(|s| s.state()))
    }

    pub fn is_dirty(&self) -> Result<bool> {
        let node = self.doc.arena.get(self.id)?;
        Ok(node.touched || node.structurally_dirty)
    }

    /// All entries as JSON, without materializing them.
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        self.doc.json_writer().entries(self.id)
    }

    pub fn to_json(&self) -> Result<Value> {
        self.to_map().map(Value::Object)
    }

    /// Sets `key`, adding it if absent.
    pub fn set(&mut self, key: &str, value: impl Into<Native>) -> Result<()> {
        self.doc.assign(Location::Key(self.id, key), value.into())
    }

    pub fn set_json(&mut self, key: &str, json: &Value) -> Result<()> {
        let value = self.doc.import_json(json)?;
        let child = value.node_id();
        let result = self.set(key, value);
        if let (Err(_), Some(child)) = (&result, child) {
            self.doc.release(child);
        }
        result
    }

    pub fn set_date(&mut self, key: &str, date: &DateTime<Utc>) -> Result<()> {
        self.set(key, convert::format_date(date))
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        self.doc.remove_key(self.id, key)
    }

    /// Appends just this dictionary to `encoder`.
    pub fn encode_to(&self, encoder: &mut Encoder) -> std::result::Result<EncodeReport, EncodeError> {
        self.doc.encode_node_to(self.id, encoder)
    }
}
