pub mod app;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;

pub use crate::error::{AppError, PipelineError};

pub use crate::app::{InMemoryRecordStore, LaiRecord, RecordStore, Upload, UploadHandler};
pub use crate::config::Configuration;
pub use crate::pipeline::{CalculationRequest, CalculationResult, CropType, LaiPipeline};
