//! Restores normalized box coordinates to absolute pixel units.

use crate::{batch::NUM_SPATIAL_COORDS, common::*, error::EvalError};

/// The `(width, height)` column of the image shape that scales each box coordinate.
const SCALE_AXIS: [i64; NUM_SPATIAL_COORDS as usize] = [0, 1, 0, 1, 0, 1, 0, 1];

/// Scales a `[n, 8]` tensor of normalized `x1, y1, x2, y2` pairs by the
/// per-sample `[n, 2]` image `(width, height)`.
pub fn denormalize(spatial: &Tensor, shape: &Tensor) -> Result<Tensor, EvalError> {
    let n = spatial.size().first().copied().unwrap_or(0);

    let expect = [n, NUM_SPATIAL_COORDS];
    if spatial.size() != expect {
        return Err(EvalError::shape_mismatch("spatial", expect, spatial.size()));
    }
    let expect = [n, 2];
    if shape.size() != expect {
        return Err(EvalError::shape_mismatch("shape", expect, shape.size()));
    }

    let axis = Tensor::of_slice(&SCALE_AXIS).to_device(shape.device());
    let scale = shape.to_kind(spatial.kind()).index_select(1, &axis);
    Ok(spatial * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn scale_by_width_and_height() -> Result<()> {
        let spatial = Tensor::of_slice(&[
            0.5f32, 0.25, 0.75, 1.0, 0.0, 0.5, 0.125, 0.75, //
            0.5, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0,
        ])
        .view([2, 8]);
        let shape = Tensor::of_slice(&[640f32, 480.0, 100.0, 200.0]).view([2, 2]);

        let boxes = denormalize(&spatial, &shape)?;
        assert_eq!(boxes.size(), [2, 8]);

        let values = Vec::<f32>::from(&boxes);
        let expect = [
            320.0, 120.0, 480.0, 480.0, 0.0, 240.0, 80.0, 360.0, //
            50.0, 100.0, 50.0, 100.0, 100.0, 200.0, 100.0, 200.0,
        ];
        values
            .iter()
            .zip(expect)
            .for_each(|(&value, expect)| assert_abs_diff_eq!(value, expect, epsilon = 1e-4));
        Ok(())
    }

    #[test]
    fn integer_shape_is_promoted() -> Result<()> {
        let spatial = Tensor::full(&[1, 8], 0.5, (Kind::Float, Device::Cpu));
        let shape = Tensor::of_slice(&[640i64, 480]).view([1, 2]);
        let boxes = denormalize(&spatial, &shape)?;
        assert_eq!(boxes.kind(), Kind::Float);
        assert_eq!(
            Vec::<f32>::from(&boxes),
            [320.0, 240.0, 320.0, 240.0, 320.0, 240.0, 320.0, 240.0]
        );
        Ok(())
    }

    #[test]
    fn reject_malformed_boxes() {
        let spatial = Tensor::zeros(&[3, 4], (Kind::Float, Device::Cpu));
        let shape = Tensor::zeros(&[3, 2], (Kind::Float, Device::Cpu));
        assert!(matches!(
            denormalize(&spatial, &shape),
            Err(EvalError::ShapeMismatch { .. })
        ));

        let spatial = Tensor::zeros(&[3, 8], (Kind::Float, Device::Cpu));
        let shape = Tensor::zeros(&[2, 2], (Kind::Float, Device::Cpu));
        assert!(denormalize(&spatial, &shape).is_err());
    }
}
