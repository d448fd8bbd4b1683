//! The finalized per-class arrays and their persistence.

use crate::{common::*, model::ScoreKind};

/// Scoring-ready candidates, indexed by object class.
///
/// Every field holds one array per class. Classes without candidates hold
/// zero-length arrays, never missing entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultArtifact {
    /// Sample keys, shape `[k]`.
    pub keys: Vec<Array1<String>>,
    /// Human and object boxes in pixels, shape `[k, 8]`.
    pub bboxes: Vec<Array2<f32>>,
    /// Shape `[k, end - start]` for each score field.
    pub scores: Vec<Array2<f32>>,
    #[serde(rename = "scores_AE")]
    pub scores_ae: Vec<Array2<f32>>,
    pub scores_rev: Vec<Array2<f32>>,
    /// Human detection confidences, shape `[k]`.
    pub hdet: Vec<Array1<f32>>,
    /// Object detection confidences, shape `[k]`.
    pub odet: Vec<Array1<f32>>,
}

impl ResultArtifact {
    pub fn num_classes(&self) -> usize {
        self.keys.len()
    }

    /// The total number of candidates over all classes.
    pub fn num_candidates(&self) -> usize {
        self.keys.iter().map(|keys| keys.len()).sum()
    }

    /// The number of classes with at least one candidate.
    pub fn num_nonempty_classes(&self) -> usize {
        self.keys.iter().filter(|keys| !keys.is_empty()).count()
    }

    pub fn scores(&self, kind: ScoreKind) -> &[Array2<f32>] {
        match kind {
            ScoreKind::S => &self.scores,
            ScoreKind::SAe => &self.scores_ae,
            ScoreKind::SRev => &self.scores_rev,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Writes the artifact as a single binary blob.
    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let mut writer = BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create result file '{}'", path.display()))?,
        );
        bincode::serialize_into(&mut writer, self)?;
        std::io::Write::flush(&mut writer)?;
        Ok(())
    }

    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let reader = BufReader::new(
            File::open(path)
                .with_context(|| format!("failed to open result file '{}'", path.display()))?,
        );
        let artifact = bincode::deserialize_from(reader)?;
        Ok(artifact)
    }
}

/// The directory holding the outputs of one named experiment.
#[derive(Debug, Clone)]
pub struct ExperimentDir {
    dir: PathBuf,
}

impl ExperimentDir {
    pub const RESULT_FILE: &'static str = "result.bin";
    pub const CONFIG_FILE: &'static str = "config.json5";

    /// Creates `root/name` if it does not exist.
    pub fn create<P>(root: P, name: &str) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        ensure!(
            !name.is_empty() && !name.contains(std::path::is_separator),
            "invalid experiment name '{}'",
            name
        );
        let dir = root.as_ref().join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn result_path(&self) -> PathBuf {
        self.dir.join(Self::RESULT_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(Self::CONFIG_FILE)
    }

    /// Echoes the resolved run configuration as pretty JSON.
    pub fn save_config<T>(&self, config: &T) -> Result<()>
    where
        T: Serialize,
    {
        let text = serde_json::to_string_pretty(config)?;
        let path = self.config_path();
        fs::write(&path, text)
            .with_context(|| format!("failed to write config file '{}'", path.display()))?;
        Ok(())
    }

    pub fn save_result(&self, artifact: &ResultArtifact) -> Result<PathBuf> {
        let path = self.result_path();
        artifact.save(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_artifact() -> ResultArtifact {
        ResultArtifact {
            keys: vec![array!["a".to_string()], Array1::from(Vec::<String>::new())],
            bboxes: vec![Array2::ones((1, 8)), Array2::zeros((0, 8))],
            scores: vec![array![[0.5, 0.25]], Array2::zeros((0, 3))],
            scores_ae: vec![Array2::zeros((0, 2)), Array2::zeros((0, 3))],
            scores_rev: vec![Array2::zeros((0, 2)), Array2::zeros((0, 3))],
            hdet: vec![array![0.9], Array1::zeros(0)],
            odet: vec![array![0.8], Array1::zeros(0)],
        }
    }

    #[test]
    fn save_into_experiment_dir() -> Result<()> {
        let root = tempfile::tempdir()?;
        let exp = ExperimentDir::create(root.path(), "run_1")?;
        assert!(exp.path().is_dir());

        // creating an existing directory is fine
        ExperimentDir::create(root.path(), "run_1")?;
        assert!(ExperimentDir::create(root.path(), "").is_err());

        let artifact = small_artifact();
        let path = exp.save_result(&artifact)?;
        assert_eq!(path, root.path().join("run_1").join("result.bin"));
        assert_eq!(ResultArtifact::load(&path)?, artifact);

        exp.save_config(&serde_json::json!({ "batch_size": 2 }))?;
        let text = fs::read_to_string(exp.config_path())?;
        assert!(text.contains("batch_size"));
        Ok(())
    }

    #[test]
    fn summary_counts() {
        let artifact = small_artifact();
        assert_eq!(artifact.num_classes(), 2);
        assert_eq!(artifact.num_candidates(), 1);
        assert_eq!(artifact.num_nonempty_classes(), 1);
        assert_eq!(artifact.scores(ScoreKind::SAe)[1].dim(), (0, 3));
    }
}
