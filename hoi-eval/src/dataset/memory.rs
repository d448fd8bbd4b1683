use super::RandomAccessDataset;
use crate::{batch::SampleRecord, common::*};

/// A dataset holding all records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    records: Vec<SampleRecord>,
}

impl MemoryDataset {
    pub fn new(records: Vec<SampleRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<SampleRecord> for MemoryDataset {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = SampleRecord>,
    {
        Self::new(iter.into_iter().collect())
    }
}

impl RandomAccessDataset for MemoryDataset {
    fn num_records(&self) -> usize {
        self.records.len()
    }

    fn nth(&self, index: usize) -> Result<SampleRecord> {
        let record = self.records.get(index).ok_or_else(|| {
            format_err!(
                "invalid index {}, the dataset has {} records",
                index,
                self.records.len()
            )
        })?;
        Ok(record.clone())
    }
}
