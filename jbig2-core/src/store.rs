//! Results of decoded segments that later segments may refer to.

use std::collections::HashMap;

use crate::bitmap::Bitmap;
use crate::decode::symbol::SymbolDictionary;
use crate::error::{HuffmanError, Result, SegmentError, bail};
use crate::huffman::{HuffmanTable, StandardTable};

/// The result of a segment that is kept for later reference.
#[derive(Debug, Clone)]
pub(crate) enum StoredSegment {
    /// An intermediate region.
    Bitmap(Bitmap),
    SymbolDictionary(SymbolDictionary),
    HuffmanTable(HuffmanTable),
}

/// All stored segments of one decode, by segment number.
#[derive(Debug, Default)]
pub(crate) struct SegmentStore {
    segments: HashMap<u32, StoredSegment>,
}

impl SegmentStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store the result of a segment. A later segment with the same number
    /// replaces it.
    pub(crate) fn insert(&mut self, number: u32, segment: StoredSegment) {
        self.segments.insert(number, segment);
    }

    /// Look up every referred-to segment, grouped by kind.
    pub(crate) fn references(&self, referred: &[u32]) -> Result<References<'_>> {
        let mut references = References::default();

        for number in referred {
            match self.segments.get(number) {
                // Refinement regions take their reference out of the store
                // instead.
                Some(StoredSegment::Bitmap(_)) => {}
                Some(StoredSegment::SymbolDictionary(dictionary)) => {
                    references.dictionaries.push(dictionary);
                }
                Some(StoredSegment::HuffmanTable(table)) => references.tables.push(table),
                None => bail!(SegmentError::MissingReference),
            }
        }

        Ok(references)
    }

    /// Remove a stored bitmap and hand it over to the caller.
    pub(crate) fn take_bitmap(&mut self, number: u32) -> Result<Bitmap> {
        match self.segments.remove(&number) {
            Some(StoredSegment::Bitmap(bitmap)) => Ok(bitmap),
            Some(other) => {
                self.segments.insert(number, other);
                bail!(SegmentError::MissingReference)
            }
            None => bail!(SegmentError::MissingReference),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.segments.len()
    }
}

/// The referred-to segments of one segment.
#[derive(Debug, Default)]
pub(crate) struct References<'a> {
    pub(crate) dictionaries: Vec<&'a SymbolDictionary>,
    tables: Vec<&'a HuffmanTable>,
    /// The next custom table to hand out.
    next_table: usize,
}

impl<'a> References<'a> {
    /// The symbols of all referred-to dictionaries, in reference order.
    pub(crate) fn symbols(&self) -> Vec<&'a Bitmap> {
        self.dictionaries
            .iter()
            .flat_map(|dictionary| dictionary.symbols.iter())
            .collect()
    }

    /// The last referred-to symbol dictionary.
    pub(crate) fn last_dictionary(&self) -> Option<&'a SymbolDictionary> {
        self.dictionaries.last().copied()
    }

    /// Select a Huffman table from a selection field: `custom` picks the
    /// next referred-to table, any other value indexes `standard`.
    pub(crate) fn select_table(
        &mut self,
        selection: u16,
        custom: u16,
        standard: &[StandardTable],
    ) -> Result<&'a HuffmanTable> {
        if selection == custom {
            let table = self
                .tables
                .get(self.next_table)
                .copied()
                .ok_or(HuffmanError::MissingTables)?;
            self.next_table += 1;

            return Ok(table);
        }

        standard
            .get(usize::from(selection))
            .map(|table| table.table())
            .ok_or_else(|| HuffmanError::InvalidSelection.into())
    }

    /// Make sure that every referred-to table was selected.
    pub(crate) fn check_tables_used(&self) -> Result<()> {
        if self.next_table != self.tables.len() {
            bail!(HuffmanError::UnusedTables);
        }

        Ok(())
    }
}
