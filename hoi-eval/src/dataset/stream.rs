use super::RandomAccessDataset;
use crate::{batch::Batch, common::*};

/// Splits a dataset into batches in enumeration order.
///
/// Batches are assembled by parallel workers but are always emitted in
/// order. The last batch may be shorter than the batch size.
#[derive(Debug)]
pub struct BatchStream<D>
where
    D: 'static + RandomAccessDataset,
{
    dataset: Arc<D>,
    batch_size: NonZeroUsize,
    num_workers: usize,
}

impl<D> BatchStream<D>
where
    D: 'static + RandomAccessDataset,
{
    pub fn new(dataset: D, batch_size: NonZeroUsize, num_workers: usize) -> Self {
        Self {
            dataset: Arc::new(dataset),
            batch_size,
            num_workers: num_workers.max(1),
        }
    }

    pub fn num_records(&self) -> usize {
        self.dataset.num_records()
    }

    pub fn num_batches(&self) -> usize {
        let batch_size = self.batch_size.get();
        (self.num_records() + batch_size - 1) / batch_size
    }

    /// Assembles batches on `num_workers` workers. It must be polled in a tokio runtime.
    pub fn stream(&self) -> Pin<Box<dyn Stream<Item = Result<Batch>> + Send>> {
        let dataset = self.dataset.clone();
        let num_records = dataset.num_records();

        let stream = stream::iter(0..num_records)
            .chunks(self.batch_size.get())
            .par_map(self.num_workers, move |indexes| {
                let dataset = dataset.clone();
                move || load_batch(&*dataset, indexes)
            });

        Box::pin(stream)
    }

    /// Assembles batches one by one on the calling thread.
    pub fn iter(&self) -> impl Iterator<Item = Result<Batch>> {
        let dataset = self.dataset.clone();
        let num_records = dataset.num_records();
        let batch_size = self.batch_size.get();

        (0..num_records)
            .step_by(batch_size)
            .map(move |start| {
                let end = (start + batch_size).min(num_records);
                load_batch(&*dataset, (start..end).collect())
            })
    }
}

fn load_batch<D>(dataset: &D, indexes: Vec<usize>) -> Result<Batch>
where
    D: RandomAccessDataset + ?Sized,
{
    let records: Vec<_> = indexes
        .into_iter()
        .map(|index| dataset.nth(index))
        .try_collect()?;
    Batch::collate(records)
}
