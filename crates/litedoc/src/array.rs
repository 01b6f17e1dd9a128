//! Index-addressed accessor over an array node.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litedoc_pack::Encoder;
use serde_json::Value;

use crate::convert;
use crate::dictionary::Dictionary;
use crate::document::Document;
use crate::encode::EncodeReport;
use crate::error::{EncodeError, Error, Result};
use crate::loader::Location;
use crate::node::NodeId;
use crate::slot::SlotState;
use crate::value::{Blob, Native, Number};

/// Borrowed handle to one array of a [`Document`].
///
/// Every index must be below [`Array::count`], otherwise the call fails with
/// [`Error::OutOfRange`]. Typed getters never fail on a type mismatch: they
/// return `None` or the zero value instead.
#[derive(Debug)]
pub struct Array<'d> {
    doc: &'d mut Document,
    id: NodeId,
}

impl<'d> Array<'d> {
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

    fn at(&self, index: usize) -> Location<'static> {
        Location::Index(self.id, index)
    }

    /// The native value at `index`, decoded on first access.
    pub fn get_object(&mut self, index: usize) -> Result<Native> {
        Ok(self.doc.load(self.at(index))?.unwrap_or(Native::Null))
    }

    /// Alias of [`Array::get_object`].
    pub fn get_value(&mut self, index: usize) -> Result<Native> {
        self.get_object(index)
    }

    pub fn get_string(&mut self, index: usize) -> Result<Option<Arc<str>>> {
        Ok(match self.get_object(index)? {
            Native::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn get_number(&mut self, index: usize) -> Result<Option<Number>> {
        Ok(convert::as_number(Some(&self.get_object(index)?)))
    }

    pub fn get_int(&mut self, index: usize) -> Result<i32> {
        Ok(convert::as_int(Some(&self.get_object(index)?)))
    }

    pub fn get_long(&mut self, index: usize) -> Result<i64> {
        Ok(convert::as_long(Some(&self.get_object(index)?)))
    }

    pub fn get_float(&mut self, index: usize) -> Result<f32> {
        Ok(convert::as_float(Some(&self.get_object(index)?)))
    }

    pub fn get_double(&mut self, index: usize) -> Result<f64> {
        Ok(convert::as_double(Some(&self.get_object(index)?)))
    }

    pub fn get_boolean(&mut self, index: usize) -> Result<bool> {
        Ok(convert::as_bool(Some(&self.get_object(index)?)))
    }

    pub fn get_blob(&mut self, index: usize) -> Result<Option<Blob>> {
        Ok(match self.get_object(index)? {
            Native::Blob(b) => Some(b),
            _ => None,
        })
    }

    /// Parses an ISO-8601 string. Anything else is `None`.
    pub fn get_date(&mut self, index: usize) -> Result<Option<DateTime<Utc>>> {
        Ok(convert::as_date(Some(&self.get_object(index)?)))
    }

    pub fn get_array(&mut self, index: usize) -> Result<Option<Array<'_>>> {
        match self.get_object(index)? {
            Native::Array(id) => self.doc.array(id).map(Some),
            _ => Ok(None),
        }
    }

    pub fn get_dictionary(&mut self, index: usize) -> Result<Option<Dictionary<'_>>> {
        match self.get_object(index)? {
            Native::Dictionary(id) => self.doc.dictionary(id).map(Some),
            _ => Ok(None),
        }
    }

    /// Materialization state of the slot at `index`.
    pub fn slot_state(&self, index: usize) -> Result<SlotState> {
        Ok(self.doc.element(self.id, index)?.state())
    }

    /// Whether this array or anything below it changed.
    pub fn is_dirty(&self) -> Result<bool> {
        let node = self.doc.arena.get(self.id)?;
        Ok(node.touched || node.structurally_dirty)
    }

    /// All elements as JSON, without materializing them.
    pub fn to_list(&self) -> Result<Vec<Value>> {
        self.doc.json_writer().items(self.id)
    }

    pub fn to_json(&self) -> Result<Value> {
        self.to_list().map(Value::Array)
    }

    /// Materializes and returns every element in order.
    pub fn values(&mut self) -> Result<Vec<Native>> {
        let count = self.count()?;
        (0..count).map(|i| self.get_object(i)).collect()
    }

    /// Replaces the element at `index`.
    pub fn set(&mut self, index: usize, value: impl Into<Native>) -> Result<()> {
        self.doc.assign(self.at(index), value.into())
    }

    /// Replaces the element at `index` with a value built from JSON.
    pub fn set_json(&mut self, index: usize, json: &Value) -> Result<()> {
        self.count_check(index)?;
        let value = self.doc.import_json(json)?;
        self.set_detached(index, value)
    }

    pub fn set_date(&mut self, index: usize, date: &DateTime<Utc>) -> Result<()> {
        self.set(index, convert::format_date(date))
    }

    pub fn append(&mut self, value: impl Into<Native>) -> Result<()> {
        let count = self.count()?;
        self.doc.insert_at(self.id, count, value.into())
    }

    pub fn append_json(&mut self, json: &Value) -> Result<()> {
        let value = self.doc.import_json(json)?;
        let count = self.count()?;
        self.insert_detached(count, value)
    }

    /// Inserts before `index`; `index == count` appends.
    pub fn insert(&mut self, index: usize, value: impl Into<Native>) -> Result<()> {
        self.doc.insert_at(self.id, index, value.into())
    }

    /// Removes the element at `index`, releasing it if it is a collection.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.doc.remove_at(self.id, index)
    }

    /// Appends just this array to `encoder`.
    pub fn encode_to(&self, encoder: &mut Encoder) -> std::result::Result<EncodeReport, EncodeError> {
        self.doc.encode_node_to(self.id, encoder)
    }

    fn count_check(&self, index: usize) -> Result<()> {
        let count = self.count()?;
        if index >= count {
            return Err(Error::OutOfRange { index, count });
        }
        Ok(())
    }

    /// Stores a freshly imported value, releasing it if the write fails.
    fn set_detached(&mut self, index: usize, value: Native) -> Result<()> {
        let child = value.node_id();
        let result = self.set(index, value);
        if let (Err(_), Some(child)) = (&result, child) {
            self.doc.release(child);
        }
        result
    }

    fn insert_detached(&mut self, index: usize, value: Native) -> Result<()> {
        let child = value.node_id();
        let result = self.insert(index, value);
        if let (Err(_), Some(child)) = (&result, child) {
            self.doc.release(child);
        }
        result
    }
}
