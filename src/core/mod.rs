pub mod analysis;
pub mod decay;
pub mod fit;
pub mod loader;
pub mod rb;
pub mod report;
pub mod spam;
pub mod stats;
pub mod zones;

pub use crate::domain::model::{
    ExperimentData, ExperimentKind, Selector, SpecRecord, SpecTable, Survival,
};
pub use crate::domain::ports::{ConfigProvider, Storage};
pub use crate::utils::error::Result;
