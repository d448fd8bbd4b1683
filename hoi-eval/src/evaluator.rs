//! The evaluation loop that turns model outputs into per-class candidates.

use crate::{
    accumulator::BucketAccumulator,
    artifact::ResultArtifact,
    batch::Batch,
    common::*,
    error::EvalError,
    model::{HoiModel, OutputFields, ScoreSet},
    obj_range::ObjectRange,
    spatial::denormalize,
    timer::Timer,
    utils::to_array2,
    verb_mapping::VerbMapping,
};

/// The default number of batches between progress reports.
pub const DEFAULT_REPORT_INTERVAL: usize = 1000;

/// Evaluator options.
#[derive(Debug, Clone)]
pub struct EvaluatorInit {
    /// The device where the model and the verb mapping run.
    pub device: Device,
    /// Report progress per this number of batches.
    pub report_interval: NonZeroUsize,
}

impl EvaluatorInit {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            report_interval: NonZeroUsize::new(DEFAULT_REPORT_INTERVAL).unwrap(),
        }
    }

    /// Validates the collaborators against each other and builds the evaluator.
    pub fn build<M>(
        self,
        model: M,
        verb_mapping: VerbMapping,
        obj_range: ObjectRange,
    ) -> Result<Evaluator<M>>
    where
        M: HoiModel,
    {
        let Self {
            device,
            report_interval,
        } = self;

        let fields = model.output_fields();
        ensure!(
            fields != OutputFields::default(),
            "the model must emit at least one score field"
        );
        obj_range.validate_width(verb_mapping.num_full())?;
        let verb_mapping = verb_mapping.to_device(device);

        info!("use device {:?}", device);
        info!("model outputs {}", fields);
        info!(
            "verb mapping from {} to {} classes",
            verb_mapping.num_compact(),
            verb_mapping.num_full()
        );

        Ok(Evaluator {
            model,
            fields,
            verb_mapping,
            obj_range,
            device,
            report_interval: report_interval.get(),
        })
    }
}

/// Runs a model over a batch stream and buckets the results by object class.
pub struct Evaluator<M>
where
    M: HoiModel,
{
    model: M,
    fields: OutputFields,
    verb_mapping: VerbMapping,
    obj_range: ObjectRange,
    device: Device,
    report_interval: usize,
}

impl<M> Evaluator<M>
where
    M: HoiModel,
{
    /// Consumes batches in order until the stream ends and finalizes all buckets.
    ///
    /// The first error aborts the run and the partial results are dropped.
    pub fn run<I>(&mut self, batches: I) -> Result<ResultArtifact>
    where
        I: IntoIterator<Item = Result<Batch>>,
    {
        let mut accumulator = BucketAccumulator::new(&self.obj_range, self.fields);
        let mut timer = Timer::new();
        let mut num_batches = 0;

        info!("start evaluation");

        for (index, batch) in batches.into_iter().enumerate() {
            let batch = batch.with_context(|| format!("failed to load batch {}", index))?;

            timer.tic();
            self.process_batch(batch, &mut accumulator)
                .with_context(|| format!("failed to evaluate batch {}", index))?;
            timer.toc();
            num_batches += 1;

            if index % self.report_interval == 0 {
                info!(
                    "{:05} iteration, average time {:.4}",
                    index,
                    timer.average_time()
                );
            }
        }

        info!(
            "processed {} samples in {} batches, average time {:.4}",
            accumulator.num_samples(),
            num_batches,
            timer.average_time()
        );

        accumulator.finalize()
    }

    /// Runs the model on one batch and appends every sample to its class bucket.
    pub fn process_batch(
        &mut self,
        batch: Batch,
        accumulator: &mut BucketAccumulator,
    ) -> Result<()> {
        batch.validate()?;
        let batch = batch.to_device(self.device);
        let n = batch.len();

        let output = {
            let model = &mut self.model;
            tch::no_grad(|| model.forward(&batch))?
        };
        self.fields.check(&output)?;

        let bboxes = to_array2(&denormalize(&batch.spatial, &batch.shape)?)?;
        let scores = output.try_map(|kind, raw| -> Result<_> {
            let mapped = self.verb_mapping.apply(&raw)?;
            let array = to_array2(&mapped)?;
            ensure!(
                array.nrows() == n,
                EvalError::shape_mismatch(
                    format!("rows of '{}'", kind.output_name()),
                    n,
                    array.nrows()
                )
            );
            Ok(array)
        })?;

        let Batch {
            key,
            obj_class,
            hdet,
            odet,
            ..
        } = batch;

        for (index, (key, class, hdet, odet)) in izip!(key, obj_class, hdet, odet).enumerate() {
            let range = self.obj_range.get(class)?;
            let slices: ScoreSet<ArrayView1<f32>> = scores
                .as_ref()
                .map(|_, array| array.slice(s![index, range.clone()]));
            accumulator.append(class, key, bboxes.row(index), slices, hdet, odet)?;
        }

        Ok(())
    }
}
