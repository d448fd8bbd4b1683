//! The evaluation program of the hoi-eval project.

pub mod common;
pub mod config;
pub mod utils;

use crate::{common::*, config::Config};
use hoi_eval::{
    dataset::{BatchStream, NpzDataset},
    model::TorchScriptModel,
    prefetch::prefetch,
    EvaluatorInit, ExperimentDir, ObjectRange, ResultArtifact, ScoreKind, VerbMapping,
};

/// The entry of evaluation program.
pub async fn start(config: Arc<Config>, exp: &str) -> Result<()> {
    // create dirs and save config
    let exp_dir = ExperimentDir::create(&config.exp_dir, exp)?;
    exp_dir.save_config(&*config)?;
    info!("save outputs to '{}'", exp_dir.path().display());

    // load lookup tables
    let obj_range = match &config.obj_range_file {
        Some(path) => ObjectRange::load(path)?,
        None => ObjectRange::hico_det(),
    };
    let verb_mapping = VerbMapping::load(&config.verb_mapping_file, Device::Cpu)?;
    match config.num_verb_classes {
        Some(num_verb_classes) => verb_mapping.validate_compact(num_verb_classes.get())?,
        None => warn!(
            "num_verb_classes is not set, assume the model emits {} verb classes",
            verb_mapping.num_compact()
        ),
    }
    obj_range.validate_width(verb_mapping.num_full())?;

    // load dataset
    info!("loading dataset");
    let batch_stream = {
        let dataset = NpzDataset::load(&config.dataset.file, &config.dataset.keys_file)?;
        BatchStream::new(dataset, config.test.batch_size, config.test.num_workers)
    };
    info!(
        "{} samples in {} batches",
        batch_stream.num_records(),
        batch_stream.num_batches()
    );

    let (producer, consumer) = prefetch(batch_stream.stream(), config.test.num_workers);

    // feeding worker
    let producer_future = tokio::task::spawn(producer).map(|result| Fallible::Ok(result??));

    // evaluation worker
    let evaluation_future = {
        let config = config.clone();

        tokio::task::spawn_blocking(move || {
            info!(
                "loading {:?} model from '{}'",
                config.model.kind,
                config.model.file.display()
            );
            let model = TorchScriptModel::load(
                &config.model.file,
                config.device,
                config.model.output_fields(),
            )?;
            let mut evaluator = EvaluatorInit {
                device: config.device,
                report_interval: config.test.report_interval,
            }
            .build(model, verb_mapping, obj_range)?;

            evaluator.run(consumer)
        })
        .map(|result| Fallible::Ok(result??))
    };

    let ((), artifact) = futures::try_join!(producer_future, evaluation_future)?;

    log_summary(&artifact);
    let path = tokio::task::spawn_blocking(move || exp_dir.save_result(&artifact)).await??;
    info!("result saved to '{}'", path.display());

    Ok(())
}

fn log_summary(artifact: &ResultArtifact) {
    info!(
        "{} candidates in {} of {} object classes",
        artifact.num_candidates(),
        artifact.num_nonempty_classes(),
        artifact.num_classes()
    );

    for kind in ScoreKind::ALL {
        let num_rows: usize = artifact.scores(kind).iter().map(|array| array.nrows()).sum();
        if num_rows == 0 {
            warn!("no '{}' scores were produced", kind.artifact_name());
        } else {
            info!("{} '{}' score rows", num_rows, kind.artifact_name());
        }
    }
}
