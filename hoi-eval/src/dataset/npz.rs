use super::RandomAccessDataset;
use crate::{
    batch::{SampleRecord, NUM_SPATIAL_COORDS},
    common::*,
    error::EvalError,
    utils::to_array2,
};

/// A dataset stored as a `.npz` archive plus a text file of sample keys.
///
/// The archive carries `[N, d]` float arrays `shape`, `spatial`,
/// `sub_vec`, `obj_vec`, `uni_vec`, `labels_s`, `labels_ro`, `labels_r`
/// and `labels_sro`, and `[N]` arrays `obj_class`, `hdet` and `odet`.
/// The key file has one key per line.
#[derive(Debug, Clone)]
pub struct NpzDataset {
    keys: Vec<String>,
    shape: Array2<f32>,
    spatial: Array2<f32>,
    sub_vec: Array2<f32>,
    obj_vec: Array2<f32>,
    uni_vec: Array2<f32>,
    labels_s: Array2<f32>,
    labels_ro: Array2<f32>,
    labels_r: Array2<f32>,
    labels_sro: Array2<f32>,
    obj_class: Vec<i64>,
    hdet: Vec<f32>,
    odet: Vec<f32>,
}

impl NpzDataset {
    pub fn load<P, Q>(file: P, keys_file: Q) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let file = file.as_ref();
        let keys_file = keys_file.as_ref();

        let arrays = Tensor::read_npz(file)
            .with_context(|| format!("failed to load dataset file '{}'", file.display()))?;
        let text = fs::read_to_string(keys_file)
            .with_context(|| format!("failed to load key file '{}'", keys_file.display()))?;
        let keys = parse_keys(&text)
            .with_context(|| format!("invalid key file '{}'", keys_file.display()))?;

        let dataset = Self::from_arrays(arrays, keys)?;
        info!(
            "loaded {} records from '{}'",
            dataset.keys.len(),
            file.display()
        );
        Ok(dataset)
    }

    /// Builds the dataset from named arrays, as read from a `.npz` archive.
    pub fn from_arrays(arrays: Vec<(String, Tensor)>, keys: Vec<String>) -> Result<Self> {
        let mut arrays: HashMap<_, _> = arrays
            .into_iter()
            .map(|(name, tensor)| (name.trim_end_matches(".npy").to_string(), tensor))
            .collect();
        let num_records = keys.len();

        let mut take = |name: &str| {
            arrays
                .remove(name)
                .ok_or_else(|| format_err!("the dataset is missing the '{}' array", name))
        };
        let mut matrix = |name: &str, width: Option<usize>| -> Result<Array2<f32>> {
            let array = to_array2(&take(name)?)?;
            ensure!(
                array.nrows() == num_records,
                EvalError::shape_mismatch(name, num_records, array.nrows())
            );
            if let Some(width) = width {
                ensure!(
                    array.ncols() == width,
                    EvalError::shape_mismatch(name, [num_records, width], array.dim())
                );
            }
            Ok(array)
        };

        let shape = matrix("shape", Some(2))?;
        let spatial = matrix("spatial", Some(NUM_SPATIAL_COORDS as usize))?;
        let sub_vec = matrix("sub_vec", None)?;
        let obj_vec = matrix("obj_vec", None)?;
        let uni_vec = matrix("uni_vec", None)?;
        let labels_s = matrix("labels_s", None)?;
        let labels_ro = matrix("labels_ro", None)?;
        let labels_r = matrix("labels_r", None)?;
        let labels_sro = matrix("labels_sro", None)?;

        let mut column = |name: &str, kind: Kind| -> Result<Tensor> {
            let tensor = take(name)?;
            ensure!(
                tensor.size() == [num_records as i64],
                EvalError::shape_mismatch(name, [num_records as i64], tensor.size())
            );
            Ok(tensor.to_kind(kind).contiguous())
        };
        let obj_class = Vec::<i64>::from(&column("obj_class", Kind::Int64)?);
        let hdet = Vec::<f32>::from(&column("hdet", Kind::Float)?);
        let odet = Vec::<f32>::from(&column("odet", Kind::Float)?);

        Ok(Self {
            keys,
            shape,
            spatial,
            sub_vec,
            obj_vec,
            uni_vec,
            labels_s,
            labels_ro,
            labels_r,
            labels_sro,
            obj_class,
            hdet,
            odet,
        })
    }
}

impl RandomAccessDataset for NpzDataset {
    fn num_records(&self) -> usize {
        self.keys.len()
    }

    fn nth(&self, index: usize) -> Result<SampleRecord> {
        ensure!(
            index < self.keys.len(),
            "invalid index {}, the dataset has {} records",
            index,
            self.keys.len()
        );

        Ok(SampleRecord {
            key: self.keys[index].clone(),
            shape: fixed_row(&self.shape, index)?,
            spatial: fixed_row(&self.spatial, index)?,
            sub_vec: self.sub_vec.row(index).to_vec(),
            obj_vec: self.obj_vec.row(index).to_vec(),
            uni_vec: self.uni_vec.row(index).to_vec(),
            labels_s: self.labels_s.row(index).to_vec(),
            labels_ro: self.labels_ro.row(index).to_vec(),
            labels_r: self.labels_r.row(index).to_vec(),
            labels_sro: self.labels_sro.row(index).to_vec(),
            obj_class: self.obj_class[index],
            hdet: self.hdet[index],
            odet: self.odet[index],
        })
    }
}

/// Reads one key per line. Only the final line break may be omitted.
fn parse_keys(text: &str) -> Result<Vec<String>> {
    text.lines()
        .enumerate()
        .map(|(index, line)| {
            ensure!(!line.is_empty(), "line {} is empty", index + 1);
            Ok(line.to_string())
        })
        .try_collect()
}

fn fixed_row<const N: usize>(array: &Array2<f32>, index: usize) -> Result<[f32; N]> {
    let mut values = [0.0; N];
    let row = array.row(index);
    ensure!(
        row.len() == N,
        EvalError::shape_mismatch("row", [N], [row.len()])
    );
    values.iter_mut().zip(row).for_each(|(dst, &src)| *dst = src);
    Ok(values)
}
