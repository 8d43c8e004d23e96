//! Customer × product interaction matrix built from raw transaction lines.

mod builder;
mod matrix;

pub use builder::{BuildReport, InteractionBuilder, InteractionData};
pub use matrix::{Cell, InteractionMatrix};
