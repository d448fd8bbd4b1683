use crate::{batch::SampleRecord, common::*};

/// A dataset of candidate pairs indexed from zero.
pub trait RandomAccessDataset
where
    Self: Send + Sync,
{
    fn num_records(&self) -> usize;

    fn nth(&self, index: usize) -> Result<SampleRecord>;
}
