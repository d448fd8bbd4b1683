use crate::{common::*, error::EvalError};

/// Copies a 2-D tensor into a host `f32` array in standard layout.
pub fn to_array2(tensor: &Tensor) -> Result<Array2<f32>, EvalError> {
    let size = tensor.size();
    let (rows, cols) = match *size.as_slice() {
        [rows, cols] => (rows as usize, cols as usize),
        _ => return Err(EvalError::shape_mismatch("array rank", 2, size.len())),
    };

    let tensor = tensor
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .contiguous();
    Array2::from_shape_vec((rows, cols), Vec::<f32>::from(&tensor))
        .map_err(|_| EvalError::shape_mismatch("array", [rows, cols], size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn copy_tensor_to_array() -> Result<()> {
        let tensor = Tensor::arange(6, (Kind::Int64, Device::Cpu)).view([2, 3]);
        let array = to_array2(&tensor)?;
        assert_eq!(array, array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]);

        // transposed views are not contiguous
        let array = to_array2(&tensor.transpose(0, 1))?;
        assert_eq!(array.dim(), (3, 2));
        assert_eq!(array.row(0).to_vec(), [0.0, 3.0]);

        let vector = Tensor::zeros(&[3], (Kind::Float, Device::Cpu));
        assert!(matches!(
            to_array2(&vector),
            Err(EvalError::ShapeMismatch { .. })
        ));
        Ok(())
    }
}
