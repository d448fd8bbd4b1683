//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use futures::stream::{self, Stream, StreamExt as _, TryStreamExt as _};
pub use itertools::{izip, Itertools as _};
pub use ndarray::{s, Array1, Array2, ArrayView1};
pub use par_stream::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::HashMap,
    fmt,
    fmt::Debug,
    fs::{self, File},
    future::Future,
    io::{BufReader, BufWriter},
    num::NonZeroUsize,
    ops::Range,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};
pub use tch::{Device, IndexOp, Kind, Tensor};
pub use tch_tensor_like::TensorLike;
pub use tracing::{debug, info, warn};

pub type Fallible<T> = Result<T, Error>;
