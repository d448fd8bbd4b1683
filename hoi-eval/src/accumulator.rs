//! Per-object-class accumulation of evaluation candidates.

use crate::{
    artifact::ResultArtifact,
    batch::NUM_SPATIAL_COORDS,
    common::*,
    error::EvalError,
    model::{OutputFields, ScoreKind, ScoreSet},
    obj_range::ObjectRange,
};

const BOX_WIDTH: usize = NUM_SPATIAL_COORDS as usize;

/// Candidates of one object class in arrival order.
///
/// Boxes and scores are stored as flat row-major buffers.
#[derive(Debug, Clone, Default)]
struct ClassBucket {
    keys: Vec<String>,
    bboxes: Vec<f32>,
    scores: ScoreSet<Vec<f32>>,
    hdet: Vec<f32>,
    odet: Vec<f32>,
}

/// Routes every candidate to the bucket of its object class.
#[derive(Debug, Clone)]
pub struct BucketAccumulator {
    fields: OutputFields,
    widths: Vec<usize>,
    buckets: Vec<ClassBucket>,
}

impl BucketAccumulator {
    /// Creates one empty bucket per object class.
    ///
    /// Only the score fields in `fields` are accepted by [append](Self::append).
    pub fn new(obj_range: &ObjectRange, fields: OutputFields) -> Self {
        let widths = obj_range.widths();
        let buckets = widths
            .iter()
            .map(|_| {
                let empty = fields.kinds().fold(ScoreSet::default(), |mut scores, kind| {
                    scores.insert(kind, vec![]);
                    scores
                });
                ClassBucket {
                    scores: empty,
                    ..Default::default()
                }
            })
            .collect();

        Self {
            fields,
            widths,
            buckets,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.buckets.len()
    }

    /// The number of candidates in the bucket of `class`.
    pub fn len(&self, class: usize) -> usize {
        self.buckets
            .get(class)
            .map(|bucket| bucket.keys.len())
            .unwrap_or(0)
    }

    /// The number of candidates over all buckets.
    pub fn num_samples(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.keys.len()).sum()
    }

    /// Appends one candidate to the bucket of `class`.
    ///
    /// Score slices must already be cut to the class range. The candidate is
    /// validated as a whole, so a failed append leaves every bucket untouched.
    pub fn append(
        &mut self,
        class: i64,
        key: String,
        bbox: ArrayView1<f32>,
        scores: ScoreSet<ArrayView1<f32>>,
        hdet: f32,
        odet: f32,
    ) -> Result<(), EvalError> {
        let index = usize::try_from(class)
            .ok()
            .filter(|&index| index < self.buckets.len())
            .ok_or(EvalError::InvalidObjectClass {
                class,
                num_classes: self.buckets.len(),
            })?;
        let width = self.widths[index];

        if bbox.len() != BOX_WIDTH {
            return Err(EvalError::shape_mismatch(
                format!("box of '{}'", key),
                [BOX_WIDTH],
                [bbox.len()],
            ));
        }
        self.fields.check(&scores)?;
        for (kind, slice) in scores.iter() {
            if slice.len() != width {
                return Err(EvalError::shape_mismatch(
                    format!("{} of '{}' in class {}", kind.output_name(), key, index),
                    [width],
                    [slice.len()],
                ));
            }
        }

        let bucket = &mut self.buckets[index];
        bucket.keys.push(key);
        bucket.bboxes.extend(bbox.iter().copied());
        for (kind, slice) in scores.iter() {
            if let Some(buffer) = bucket.scores_mut(kind) {
                buffer.extend(slice.iter().copied());
            }
        }
        bucket.hdet.push(hdet);
        bucket.odet.push(odet);

        Ok(())
    }

    /// Converts every bucket into fixed-shape arrays.
    ///
    /// Absent score fields and empty classes produce zero-length arrays with
    /// the class score width.
    pub fn finalize(self) -> Result<ResultArtifact> {
        let Self {
            widths, buckets, ..
        } = self;

        let num_classes = buckets.len();
        let mut artifact = ResultArtifact {
            keys: Vec::with_capacity(num_classes),
            bboxes: Vec::with_capacity(num_classes),
            scores: Vec::with_capacity(num_classes),
            scores_ae: Vec::with_capacity(num_classes),
            scores_rev: Vec::with_capacity(num_classes),
            hdet: Vec::with_capacity(num_classes),
            odet: Vec::with_capacity(num_classes),
        };

        for (bucket, width) in buckets.into_iter().zip(widths) {
            let ClassBucket {
                keys,
                bboxes,
                scores,
                hdet,
                odet,
            } = bucket;
            let rows = keys.len();

            let to_scores = |buffer: Option<Vec<f32>>| -> Result<Array2<f32>> {
                let array = match buffer {
                    Some(buffer) => Array2::from_shape_vec((rows, width), buffer)?,
                    None => Array2::zeros((0, width)),
                };
                Ok(array)
            };
            let ScoreSet { s, s_ae, s_rev } = scores;

            artifact.keys.push(Array1::from(keys));
            artifact
                .bboxes
                .push(Array2::from_shape_vec((rows, BOX_WIDTH), bboxes)?);
            artifact.scores.push(to_scores(s)?);
            artifact.scores_ae.push(to_scores(s_ae)?);
            artifact.scores_rev.push(to_scores(s_rev)?);
            artifact.hdet.push(Array1::from(hdet));
            artifact.odet.push(Array1::from(odet));
        }

        Ok(artifact)
    }
}

impl ClassBucket {
    fn scores_mut(&mut self, kind: ScoreKind) -> Option<&mut Vec<f32>> {
        match kind {
            ScoreKind::S => self.scores.s.as_mut(),
            ScoreKind::SAe => self.scores.s_ae.as_mut(),
            ScoreKind::SRev => self.scores.s_rev.as_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj_range::NUM_OBJECT_CLASSES;
    use ndarray::aview1;

    fn scores_of(width: usize, value: f32) -> Vec<f32> {
        vec![value; width]
    }

    #[test]
    fn route_by_object_class() -> Result<()> {
        let table = ObjectRange::hico_det();
        let fields = OutputFields {
            s: true,
            s_ae: false,
            s_rev: true,
        };
        let mut acc = BucketAccumulator::new(&table, fields);
        assert_eq!(acc.num_classes(), NUM_OBJECT_CLASSES);

        // class 3 spans 147..=160, class 22 spans 596..=600
        let width3 = table.get(3)?.len();
        let width22 = table.get(22)?.len();
        assert_eq!((width3, width22), (14, 5));

        let samples = [(3, "img1_0", 0.1), (22, "img2_0", 0.2), (3, "img1_1", 0.3)];
        for (class, key, value) in samples {
            let width = table.get(class)?.len();
            let s = scores_of(width, value);
            let s_rev = scores_of(width, -value);
            acc.append(
                class,
                key.to_string(),
                aview1(&[value; 8]),
                ScoreSet {
                    s: Some(aview1(&s)),
                    s_ae: None,
                    s_rev: Some(aview1(&s_rev)),
                },
                0.9,
                value,
            )?;
        }
        assert_eq!(acc.len(3), 2);
        assert_eq!(acc.len(22), 1);
        assert_eq!(acc.num_samples(), 3);

        let artifact = acc.finalize()?;
        assert_eq!(artifact.num_classes(), NUM_OBJECT_CLASSES);
        assert_eq!(artifact.keys[3].to_vec(), ["img1_0", "img1_1"]);
        assert_eq!(artifact.keys[22].to_vec(), ["img2_0"]);
        assert_eq!(artifact.bboxes[3].dim(), (2, 8));
        assert_eq!(artifact.scores[3].dim(), (2, width3));
        assert_eq!(artifact.scores[3][[1, 0]], 0.3);
        assert_eq!(artifact.scores_rev[22].dim(), (1, width22));
        assert_eq!(artifact.odet[3].to_vec(), [0.1, 0.3]);

        // the absent field keeps the class width with zero rows
        assert_eq!(artifact.scores_ae[3].dim(), (0, width3));

        for class in (0..NUM_OBJECT_CLASSES).filter(|&class| class != 3 && class != 22) {
            let width = table.get(class as i64)?.len();
            assert!(artifact.keys[class].is_empty());
            assert_eq!(artifact.bboxes[class].dim(), (0, 8));
            assert_eq!(artifact.scores[class].dim(), (0, width));
            assert!(artifact.hdet[class].is_empty());
            assert!(artifact.odet[class].is_empty());
        }
        Ok(())
    }

    #[test]
    fn failed_append_is_atomic() -> Result<()> {
        let table = ObjectRange::hico_det();
        let mut acc = BucketAccumulator::new(&table, [ScoreKind::S].into_iter().collect());
        let width = table.get(5)?.len();
        let good = scores_of(width, 1.0);
        let bad = scores_of(width + 1, 1.0);
        fn only_s(slice: &[f32]) -> ScoreSet<ArrayView1<f32>> {
            ScoreSet {
                s: Some(aview1(slice)),
                s_ae: None,
                s_rev: None,
            }
        }

        let err = acc
            .append(80, "a".into(), aview1(&[0.0; 8]), only_s(&good), 1.0, 1.0)
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::InvalidObjectClass {
                class: 80,
                num_classes: 80
            }
        );

        let err = acc
            .append(5, "b".into(), aview1(&[0.0; 8]), only_s(&bad), 1.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { .. }));

        let err = acc
            .append(5, "c".into(), aview1(&[0.0; 8]), ScoreSet::default(), 1.0, 1.0)
            .unwrap_err();
        assert_eq!(err, EvalError::MissingOutput { field: "s" });

        let err = acc
            .append(5, "d".into(), aview1(&[0.0; 4]), only_s(&good), 1.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { .. }));

        assert_eq!(acc.num_samples(), 0);
        acc.append(5, "e".into(), aview1(&[0.0; 8]), only_s(&good), 1.0, 1.0)?;
        assert_eq!(acc.len(5), 1);
        Ok(())
    }
}
