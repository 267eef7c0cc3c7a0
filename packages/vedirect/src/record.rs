use alloc::vec::Vec;

use crate::{checksum::ChecksumAccumulator, decoder::DiscardReason, field::Field};

/// A complete, checksum-verified text block.
///
/// Fields are kept in the order they first appeared on the wire. A label sent
/// twice in one block keeps its first position and its last value. The
/// terminating `Checksum` field is included.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// Returns the raw value of `label`.
    pub fn get(&self, label: impl AsRef<[u8]>) -> Option<&[u8]> {
        let label = label.as_ref();
        self.fields
            .iter()
            .find(|field| field.label() == label)
            .map(Field::value)
    }

    /// Returns the value of `label` as a string slice, if present and valid UTF-8.
    pub fn get_str(&self, label: impl AsRef<[u8]>) -> Option<&str> {
        core::str::from_utf8(self.get(label)?).ok()
    }

    /// The raw checksum byte the device sent.
    pub fn checksum(&self) -> Option<u8> {
        self.fields
            .iter()
            .rev()
            .find(|field| field.is_checksum())
            .and_then(|field| field.value().first().copied())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Iterates over `(label, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.fields.iter().map(|field| (field.label(), field.value()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    fn insert(&mut self, field: Field) {
        match self
            .fields
            .iter_mut()
            .find(|existing| existing.label() == field.label())
        {
            Some(existing) => existing.set_value(field.into_parts().1),
            None => self.fields.push(field),
        }
    }
}

impl FromIterator<Field> for Record {
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        let mut record = Record::default();
        for field in iter {
            record.insert(field);
        }
        record
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Field;
    type IntoIter = core::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Collects the fields of one text block until its `Checksum` field arrives.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    record: Record,
    max_fields: usize,
}

impl RecordAssembler {
    pub fn new(max_fields: usize) -> Self {
        Self {
            record: Record::default(),
            max_fields,
        }
    }

    /// Adds a field to the in-progress record, overwriting an earlier value
    /// with the same label.
    ///
    /// # Errors
    ///
    /// Returns [`DiscardReason::TooManyFields`] when a new label would exceed
    /// the field limit. The in-progress record is dropped.
    pub fn insert(&mut self, field: Field) -> Result<(), DiscardReason> {
        let is_new = self.record.get(field.label()).is_none();
        if is_new && self.record.len() >= self.max_fields {
            self.clear();
            return Err(DiscardReason::TooManyFields);
        }

        self.record.insert(field);
        Ok(())
    }

    /// Ends the in-progress record with its `Checksum` field.
    ///
    /// `checksum` must already include every byte of the block, checksum
    /// value included. The assembler is empty afterwards either way.
    ///
    /// # Errors
    ///
    /// Returns [`DiscardReason::EmptyBlock`] if no field preceded the checksum,
    /// and [`DiscardReason::ChecksumMismatch`] if the block does not sum to
    /// zero. The record is dropped.
    pub fn finish(
        &mut self,
        checksum_field: Field,
        checksum: &ChecksumAccumulator,
    ) -> Result<Record, DiscardReason> {
        // A lone `Checksum` field is the leftover tail of a dropped block.
        if self.record.is_empty() {
            return Err(DiscardReason::EmptyBlock);
        }

        self.record.insert(checksum_field);
        let record = core::mem::take(&mut self.record);

        if checksum.is_valid() {
            Ok(record)
        } else {
            Err(DiscardReason::ChecksumMismatch {
                sum: checksum.sum(),
            })
        }
    }

    /// Number of fields collected so far.
    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    pub fn clear(&mut self) {
        self.record.fields.clear();
    }
}
