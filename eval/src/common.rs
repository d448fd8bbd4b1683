//! Common imports from external crates.

pub use anyhow::{Error, Result};
pub use futures::future::FutureExt as _;
pub use once_cell::sync::Lazy;
pub use semver::{Version, VersionReq};
pub use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
pub use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use tch::Device;
pub use tracing::{info, warn};

pub type Fallible<T> = Result<T, Error>;
