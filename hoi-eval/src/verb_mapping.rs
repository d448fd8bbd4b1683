//! The fixed linear map from the compact verb vocabulary to the full interaction vocabulary.

use crate::{common::*, error::EvalError};

/// A `[C_compact, C_full]` matrix kept on the compute device for the whole run.
#[derive(Debug)]
pub struct VerbMapping {
    matrix: Tensor,
}

impl VerbMapping {
    /// Loads the matrix from a `.npy` file and moves it to `device`.
    pub fn load<P>(path: P, device: Device) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let matrix = Tensor::read_npy(path)
            .with_context(|| format!("failed to load verb mapping '{}'", path.display()))?;
        Self::new(matrix, device)
    }

    pub fn new(matrix: Tensor, device: Device) -> Result<Self> {
        let size = matrix.size();
        ensure!(
            size.len() == 2,
            EvalError::shape_mismatch("verb mapping rank", 2, size.len())
        );
        ensure!(
            size.iter().all(|&dim| dim > 0),
            EvalError::shape_mismatch("verb mapping", "non-empty matrix", size)
        );

        let matrix = matrix.to_kind(Kind::Float).to_device(device);
        Ok(Self { matrix })
    }

    /// Moves the matrix to another device.
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            matrix: self.matrix.to_device(device),
        }
    }

    /// The number of compact verb classes the model emits.
    pub fn num_compact(&self) -> usize {
        self.matrix.size()[0] as usize
    }

    /// The number of interaction classes after mapping.
    pub fn num_full(&self) -> usize {
        self.matrix.size()[1] as usize
    }

    pub fn matrix(&self) -> &Tensor {
        &self.matrix
    }

    /// Checks the compact width of the model against the matrix.
    pub fn validate_compact(&self, num_compact: usize) -> Result<(), EvalError> {
        if num_compact != self.num_compact() {
            return Err(EvalError::shape_mismatch(
                "compact verb classes",
                self.num_compact(),
                num_compact,
            ));
        }
        Ok(())
    }

    /// Maps `[n, C_compact]` raw scores to `[n, C_full]` without any activation.
    pub fn apply(&self, scores: &Tensor) -> Result<Tensor, EvalError> {
        let size = scores.size();
        match *size.as_slice() {
            [_, width] if width as usize == self.num_compact() => {}
            _ => {
                return Err(EvalError::shape_mismatch(
                    "raw scores",
                    ["n".to_string(), self.num_compact().to_string()],
                    size,
                ))
            }
        }

        let scores = scores
            .to_kind(Kind::Float)
            .to_device(self.matrix.device());
        Ok(scores.matmul(&self.matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn random_mapping(num_compact: i64, num_full: i64) -> Result<VerbMapping> {
        let matrix = Tensor::rand(&[num_compact, num_full], (Kind::Float, Device::Cpu));
        VerbMapping::new(matrix, Device::Cpu)
    }

    #[test]
    fn mapping_is_linear() -> Result<()> {
        let mut rng = rand::thread_rng();
        let num_compact = rng.gen_range(1..20);
        let num_full = rng.gen_range(1..50);
        let n = rng.gen_range(1..8);
        let mapping = random_mapping(num_compact, num_full)?;

        let lhs = Tensor::randn(&[n, num_compact], (Kind::Float, Device::Cpu));
        let rhs = Tensor::randn(&[n, num_compact], (Kind::Float, Device::Cpu));

        let sum_then_map = mapping.apply(&(&lhs + &rhs))?;
        let map_then_sum = mapping.apply(&lhs)? + mapping.apply(&rhs)?;
        assert_eq!(sum_then_map.size(), [n, num_full]);
        assert!(sum_then_map.allclose(&map_then_sum, 1e-5, 1e-5, false));

        let zeros = Tensor::zeros(&[n, num_compact], (Kind::Float, Device::Cpu));
        let mapped = mapping.apply(&zeros)?;
        assert_eq!(f64::from(&mapped.abs().max()), 0.0);
        Ok(())
    }

    #[test]
    fn one_hot_mapping_selects_columns() -> Result<()> {
        // compact class i expands to full classes 2i and 2i + 1
        let matrix = Tensor::of_slice(&[
            1f32, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 1.0,
        ])
        .view([2, 4]);
        let mapping = VerbMapping::new(matrix, Device::Cpu)?;
        assert_eq!(mapping.num_compact(), 2);
        assert_eq!(mapping.num_full(), 4);

        let scores = Tensor::of_slice(&[0.25f32, 0.75]).view([1, 2]);
        let mapped = mapping.apply(&scores)?;
        assert_eq!(Vec::<f32>::from(&mapped), [0.25, 0.25, 0.75, 0.75]);
        Ok(())
    }

    #[test]
    fn reject_compact_width_mismatch() -> Result<()> {
        let mapping = random_mapping(117, 600)?;
        let scores = Tensor::zeros(&[4, 116], (Kind::Float, Device::Cpu));
        assert!(matches!(
            mapping.apply(&scores),
            Err(EvalError::ShapeMismatch { .. })
        ));
        assert!(mapping.validate_compact(117).is_ok());
        assert!(mapping.validate_compact(116).is_err());

        let vector = Tensor::zeros(&[117], (Kind::Float, Device::Cpu));
        assert!(VerbMapping::new(vector, Device::Cpu).is_err());
        Ok(())
    }

    #[test]
    fn load_from_npy() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("verb_mapping.npy");
        let matrix = Tensor::rand(&[3, 5], (Kind::Double, Device::Cpu));
        matrix.write_npy(&path)?;

        let mapping = VerbMapping::load(&path, Device::Cpu)?;
        assert_eq!(mapping.matrix().kind(), Kind::Float);
        assert_eq!(mapping.matrix().size(), [3, 5]);
        Ok(())
    }
}
