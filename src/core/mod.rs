pub mod converter;
pub mod date;
pub mod engine;
pub mod etl;
pub mod grouper;
pub mod name;
pub mod pipeline;
pub mod render;
pub mod template;
pub mod validator;
pub mod watcher;

pub use crate::domain::model::{Record, Row, TransformOutput, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
