pub mod accumulate;
pub mod etl;
pub mod piper;
pub mod table;
pub mod update;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
