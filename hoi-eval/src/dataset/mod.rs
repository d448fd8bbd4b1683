//! Evaluation datasets and the ordered batch stream built on them.

mod dataset;
mod memory;
mod npz;
mod stream;

pub use dataset::*;
pub use memory::*;
pub use npz::*;
pub use stream::*;
