//! The lookup table from object classes to slices of the interaction score vector.

use crate::{common::*, error::EvalError};

/// The number of object classes in HICO-DET.
pub const NUM_OBJECT_CLASSES: usize = 80;

/// HICO-DET object ranges in the 1-indexed inclusive convention.
const HICO_DET_RANGES: [(usize, usize); NUM_OBJECT_CLASSES] = [
    (161, 170), (11, 24), (66, 76), (147, 160), (1, 10),
    (55, 65), (187, 194), (568, 576), (32, 46), (563, 567),
    (326, 330), (503, 506), (415, 418), (244, 247), (25, 31),
    (77, 86), (112, 129), (130, 146), (175, 186), (97, 107),
    (314, 325), (236, 239), (596, 600), (343, 348), (209, 214),
    (577, 584), (353, 356), (539, 546), (507, 516), (337, 342),
    (464, 474), (475, 483), (489, 502), (369, 376), (225, 232),
    (233, 235), (454, 463), (517, 528), (534, 538), (47, 54),
    (589, 595), (296, 305), (331, 336), (377, 383), (484, 488),
    (253, 257), (215, 224), (199, 208), (439, 445), (398, 407),
    (258, 264), (274, 283), (357, 363), (419, 429), (306, 313),
    (265, 273), (87, 92), (93, 96), (171, 174), (240, 243),
    (108, 111), (551, 558), (195, 198), (384, 389), (394, 397),
    (435, 438), (364, 368), (284, 290), (390, 393), (408, 414),
    (547, 550), (450, 453), (430, 434), (248, 252), (291, 295),
    (585, 588), (446, 449), (529, 533), (349, 352), (559, 562),
];

/// Maps each object class to the half-open range `[start, end)` of
/// interaction scores relevant to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRange {
    ranges: Vec<Range<usize>>,
}

impl ObjectRange {
    /// The built-in HICO-DET table covering 600 interaction classes.
    pub fn hico_det() -> Self {
        let ranges = HICO_DET_RANGES
            .iter()
            .map(|&(first, last)| (first - 1)..last)
            .collect();
        Self { ranges }
    }

    /// Builds the table from 1-indexed inclusive `(first, last)` pairs.
    pub fn from_one_indexed(pairs: &[(usize, usize)]) -> Result<Self> {
        ensure!(
            pairs.len() == NUM_OBJECT_CLASSES,
            EvalError::shape_mismatch("object range table", NUM_OBJECT_CLASSES, pairs.len())
        );

        let ranges: Vec<_> = pairs
            .iter()
            .enumerate()
            .map(|(class, &(first, last))| {
                ensure!(
                    first >= 1 && first <= last,
                    "invalid object range ({}, {}) for class {}",
                    first,
                    last,
                    class
                );
                Ok((first - 1)..last)
            })
            .try_collect()?;

        Ok(Self { ranges })
    }

    /// Loads a JSON array of 1-indexed inclusive `[first, last]` pairs.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let pairs: Vec<(usize, usize)> = serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse object range file '{}'", path.display()))?;
        Self::from_one_indexed(&pairs)
    }

    pub fn num_classes(&self) -> usize {
        self.ranges.len()
    }

    /// Returns the score range of an object class, rejecting indexes out of `0..80`.
    pub fn get(&self, class: i64) -> Result<Range<usize>, EvalError> {
        usize::try_from(class)
            .ok()
            .and_then(|index| self.ranges.get(index))
            .cloned()
            .ok_or(EvalError::InvalidObjectClass {
                class,
                num_classes: self.ranges.len(),
            })
    }

    /// Range widths indexed by object class.
    pub fn widths(&self) -> Vec<usize> {
        self.ranges.iter().map(|range| range.len()).collect()
    }

    /// Checks every range fits in a score vector of the given width.
    pub fn validate_width(&self, width: usize) -> Result<(), EvalError> {
        self.ranges
            .iter()
            .enumerate()
            .try_for_each(|(class, range)| {
                if range.start < range.end && range.end <= width {
                    Ok(())
                } else {
                    Err(EvalError::InvalidRange {
                        class,
                        start: range.start,
                        end: range.end,
                        width,
                    })
                }
            })
    }
}
