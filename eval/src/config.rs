use crate::common::*;
use hoi_eval::{evaluator::DEFAULT_REPORT_INTERVAL, ModelKind, OutputFields, ScoreKind};

pub use dataset::*;
pub use model::*;
pub use test::*;

pub static CONFIG_VERSION: Lazy<VersionReq> = Lazy::new(|| VersionReq::parse("0.1.0").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_version")]
    pub version: Version,
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    pub test: TestConfig,
    /// The `.npy` matrix mapping compact verb scores to the interaction classes.
    pub verb_mapping_file: PathBuf,
    /// JSON list of 1-indexed `[first, last]` interaction ranges per object class.
    /// The HICO-DET table is used if it is not set.
    #[serde(default)]
    pub obj_range_file: Option<PathBuf>,
    /// Expected number of rows of the verb mapping.
    #[serde(default)]
    pub num_verb_classes: Option<NonZeroUsize>,
    /// The device where the model runs.
    #[serde(with = "tch_serde::serde_device")]
    pub device: Device,
    /// The parent directory of experiment directories.
    #[serde(default = "default_exp_dir")]
    pub exp_dir: PathBuf,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

mod model {
    use super::*;

    /// Model configuration.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ModelConfig {
        pub kind: ModelKind,
        /// The TorchScript file of the model.
        pub file: PathBuf,
        /// Score fields the model emits. Defaults to the fields of the model kind.
        #[serde(default)]
        pub outputs: Option<Vec<ScoreKind>>,
    }

    impl ModelConfig {
        pub fn output_fields(&self) -> OutputFields {
            match &self.outputs {
                Some(outputs) => outputs.iter().copied().collect(),
                None => self.kind.default_outputs(),
            }
        }
    }
}

mod dataset {
    use super::*;

    /// Test set options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// The `.npz` file of sample arrays.
        pub file: PathBuf,
        /// The text file of sample keys, one per line.
        pub keys_file: PathBuf,
    }
}

mod test {
    use super::*;

    /// Evaluation loop options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TestConfig {
        pub batch_size: NonZeroUsize,
        /// Number of batch assembling workers.
        pub num_workers: usize,
        /// Report progress per this number of batches.
        #[serde(default = "default_report_interval")]
        pub report_interval: NonZeroUsize,
    }
}

fn default_exp_dir() -> PathBuf {
    PathBuf::from("exp")
}

fn default_report_interval() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_REPORT_INTERVAL).unwrap()
}

pub fn deserialize_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let version = Version::parse(&text).map_err(|err| {
        D::Error::custom(format!(
            "failed to parse version number '{}': {:?}",
            text, err
        ))
    })?;

    if !CONFIG_VERSION.matches(&version) {
        return Err(D::Error::custom(format!(
            "incompatible version: get '{}', but it is incompatible with requirement '{}'",
            version, &*CONFIG_VERSION,
        )));
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        version: "0.1.0",
        model: { kind: "IDN", file: "idn.pt" },
        dataset: { file: "test.npz", keys_file: "keys.txt" },
        test: { batch_size: 4, num_workers: 2 },
        verb_mapping_file: "verb_mapping.npy",
        device: "cpu",
    }"#;

    #[test]
    fn parse_minimal_config() -> Result<()> {
        let config: Config = json5::from_str(MINIMAL)?;
        assert_eq!(config.model.kind, ModelKind::Idn);
        assert_eq!(config.model.output_fields(), OutputFields::all());
        assert_eq!(config.test.batch_size.get(), 4);
        assert_eq!(config.test.report_interval.get(), DEFAULT_REPORT_INTERVAL);
        assert_eq!(config.exp_dir, Path::new("exp"));
        assert_eq!(config.device, Device::Cpu);
        assert!(config.obj_range_file.is_none());
        assert!(config.num_verb_classes.is_none());
        Ok(())
    }

    #[test]
    fn explicit_outputs_override_model_kind() -> Result<()> {
        let text = MINIMAL.replace(
            r#"kind: "IDN", file: "idn.pt""#,
            r#"kind: "AE", file: "ae.pt", outputs: ["s", "s_rev"]"#,
        );
        let config: Config = json5::from_str(&text)?;
        let fields = config.model.output_fields();
        assert!(fields.contains(ScoreKind::S));
        assert!(!fields.contains(ScoreKind::SAe));
        assert!(fields.contains(ScoreKind::SRev));
        Ok(())
    }

    #[test]
    fn shipped_config_checks_verb_classes() -> Result<()> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("eval.json5");
        let config = Config::open(&path)?;
        assert_eq!(config.num_verb_classes.map(|num| num.get()), Some(117));
        assert_eq!(config.model.kind, ModelKind::Idn);
        Ok(())
    }

    #[test]
    fn reject_incompatible_version() {
        let text = MINIMAL.replace(r#"version: "0.1.0""#, r#"version: "0.2.0""#);
        assert!(json5::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn reject_zero_batch_size() {
        let text = MINIMAL.replace("batch_size: 4", "batch_size: 0");
        assert!(json5::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn echoed_config_parses_back() -> Result<()> {
        let config: Config = json5::from_str(MINIMAL)?;
        let text = serde_json::to_string_pretty(&config)?;
        let echoed: Config = json5::from_str(&text)?;
        assert_eq!(echoed.version, config.version);
        assert_eq!(echoed.model.file, config.model.file);
        assert_eq!(echoed.test.num_workers, config.test.num_workers);
        Ok(())
    }
}
