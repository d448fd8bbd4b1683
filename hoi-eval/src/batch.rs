//! Per-sample records and the collated batch fed to the model.

use crate::{common::*, error::EvalError};

/// The number of normalized coordinates of a human-object box pair.
pub const NUM_SPATIAL_COORDS: i64 = 8;

/// A single human-object candidate pair in host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub key: String,
    /// Image `(width, height)` in pixels.
    pub shape: [f32; 2],
    /// Normalized `x1, y1, x2, y2` of the human box then the object box.
    pub spatial: [f32; NUM_SPATIAL_COORDS as usize],
    pub sub_vec: Vec<f32>,
    pub obj_vec: Vec<f32>,
    pub uni_vec: Vec<f32>,
    pub labels_s: Vec<f32>,
    pub labels_ro: Vec<f32>,
    pub labels_r: Vec<f32>,
    pub labels_sro: Vec<f32>,
    pub obj_class: i64,
    pub hdet: f32,
    pub odet: f32,
}

impl SampleRecord {
    fn vectors(&self) -> [(&'static str, &[f32]); 9] {
        [
            ("shape", self.shape.as_slice()),
            ("spatial", self.spatial.as_slice()),
            ("sub_vec", self.sub_vec.as_slice()),
            ("obj_vec", self.obj_vec.as_slice()),
            ("uni_vec", self.uni_vec.as_slice()),
            ("labels_s", self.labels_s.as_slice()),
            ("labels_ro", self.labels_ro.as_slice()),
            ("labels_r", self.labels_r.as_slice()),
            ("labels_sro", self.labels_sro.as_slice()),
        ]
    }
}

/// A batch of `n` samples. Every field is indexed by the sample along its first dimension.
#[derive(Debug, TensorLike)]
pub struct Batch {
    /// Shape `[n, 2]`.
    pub shape: Tensor,
    /// Shape `[n, 8]`.
    pub spatial: Tensor,
    pub sub_vec: Tensor,
    pub obj_vec: Tensor,
    pub uni_vec: Tensor,
    pub labels_s: Tensor,
    pub labels_ro: Tensor,
    pub labels_r: Tensor,
    pub labels_sro: Tensor,
    #[tensor_like(clone)]
    pub obj_class: Vec<i64>,
    #[tensor_like(clone)]
    pub key: Vec<String>,
    #[tensor_like(clone)]
    pub hdet: Vec<f32>,
    #[tensor_like(clone)]
    pub odet: Vec<f32>,
}

impl Batch {
    /// Stacks sample records into a batch on CPU, preserving their order.
    pub fn collate(records: Vec<SampleRecord>) -> Result<Self> {
        let first = records
            .first()
            .ok_or_else(|| format_err!("cannot collate an empty list of records"))?;
        let n = records.len() as i64;

        // every record must agree on per-field lengths
        let widths: Vec<_> = first
            .vectors()
            .iter()
            .map(|(_, values)| values.len())
            .collect();
        records.iter().try_for_each(|record| -> Result<_> {
            izip!(record.vectors(), &widths).try_for_each(|((name, values), &width)| {
                ensure!(
                    values.len() == width,
                    EvalError::shape_mismatch(
                        format!("field '{}' of record '{}'", name, record.key),
                        [width],
                        [values.len()]
                    )
                );
                Ok(())
            })
        })?;

        let stack = |select: fn(&SampleRecord) -> &[f32]| {
            let width = select(first).len() as i64;
            let data: Vec<f32> = records
                .iter()
                .flat_map(|record| select(record).iter().copied())
                .collect();
            Tensor::of_slice(&data).view([n, width])
        };

        let batch = Batch {
            shape: stack(|record| record.shape.as_slice()),
            spatial: stack(|record| record.spatial.as_slice()),
            sub_vec: stack(|record| record.sub_vec.as_slice()),
            obj_vec: stack(|record| record.obj_vec.as_slice()),
            uni_vec: stack(|record| record.uni_vec.as_slice()),
            labels_s: stack(|record| record.labels_s.as_slice()),
            labels_ro: stack(|record| record.labels_ro.as_slice()),
            labels_r: stack(|record| record.labels_r.as_slice()),
            labels_sro: stack(|record| record.labels_sro.as_slice()),
            obj_class: records.iter().map(|record| record.obj_class).collect(),
            key: records.iter().map(|record| record.key.clone()).collect(),
            hdet: records.iter().map(|record| record.hdet).collect(),
            odet: records.iter().map(|record| record.odet).collect(),
        };
        batch.validate()?;

        Ok(batch)
    }

    /// The batch size.
    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Named tensor fields in a fixed order.
    pub fn tensors(&self) -> [(&'static str, &Tensor); 9] {
        [
            ("shape", &self.shape),
            ("spatial", &self.spatial),
            ("sub_vec", &self.sub_vec),
            ("obj_vec", &self.obj_vec),
            ("uni_vec", &self.uni_vec),
            ("labels_s", &self.labels_s),
            ("labels_ro", &self.labels_ro),
            ("labels_r", &self.labels_r),
            ("labels_sro", &self.labels_sro),
        ]
    }

    /// Checks all fields agree on the batch size and the box tensors are well-shaped.
    pub fn validate(&self) -> Result<(), EvalError> {
        let n = self.len();

        let lengths = [
            ("obj_class", self.obj_class.len()),
            ("hdet", self.hdet.len()),
            ("odet", self.odet.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(EvalError::shape_mismatch(name, [n], [len]));
            }
        }

        for (name, tensor) in self.tensors() {
            let size = tensor.size();
            if size.first().map(|&dim| dim as usize) != Some(n) {
                return Err(EvalError::shape_mismatch(
                    format!("leading dimension of '{}'", name),
                    n,
                    size,
                ));
            }
        }

        let expect = [n as i64, 2];
        if self.shape.size() != expect {
            return Err(EvalError::shape_mismatch("shape", expect, self.shape.size()));
        }

        let expect = [n as i64, NUM_SPATIAL_COORDS];
        if self.spatial.size() != expect {
            return Err(EvalError::shape_mismatch(
                "spatial",
                expect,
                self.spatial.size(),
            ));
        }

        Ok(())
    }
}
