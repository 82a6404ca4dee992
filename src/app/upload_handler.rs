use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use crate::app::record::LaiRecord;
use crate::app::record_store::RecordStore;
use crate::config::Configuration;
use crate::error::AppError;
use crate::pipeline::{CalculationRequest, CropType, LaiPipeline};
use crate::service::calculation_service::{self, BoxedCalculationService, CalculationServiceBuilder};

/// An uploaded file as the outer layer hands it over.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub filename: Option<String>,
    pub bytes: Option<Vec<u8>>,
    pub crop_type: Option<String>,
}

impl Upload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            ..Self::default()
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn crop_type(mut self, crop_type: impl Into<String>) -> Self {
        self.crop_type = Some(crop_type.into());
        self
    }
}

/// Validates uploads, runs the calculation and stores finished records.
pub struct UploadHandler {
    pipeline: Arc<LaiPipeline>,
    service: Mutex<BoxedCalculationService>,
    store: Arc<dyn RecordStore>,
    timeout: Option<Duration>,
}

impl UploadHandler {
    pub fn new(config: &Configuration, store: Arc<dyn RecordStore>) -> Result<Self, AppError> {
        let pipeline = Arc::new(LaiPipeline::new(config)?);
        let service = CalculationServiceBuilder::new(pipeline.clone())
            .config(&config.service)
            .build();
        Ok(Self {
            pipeline,
            service: Mutex::new(service),
            store,
            timeout: config.service.timeout(),
        })
    }

    /// Returns the id of the stored record. Failures are logged in full here;
    /// callers should only surface [`AppError::user_code`].
    pub async fn submit(&self, upload: Upload) -> Result<Uuid, AppError> {
        let filename = upload.filename.clone();
        self.process(upload).await.inspect_err(|e| {
            tracing::error!("LAI calculation failed for {:?}: {}", filename, e);
        })
    }

    pub async fn view(&self, id: Uuid) -> Result<Arc<LaiRecord>, AppError> {
        self.store.get(id).await.ok_or(AppError::NotFound(id))
    }

    async fn process(&self, upload: Upload) -> Result<Uuid, AppError> {
        let bytes = upload.bytes.ok_or(AppError::MissingImage)?;
        // Cheap rejections before a worker is tied up.
        self.pipeline.loader().check_payload(&bytes)?;

        let crop_type = match upload.crop_type.as_deref() {
            None | Some("") => CropType::default(),
            Some(raw) => raw
                .parse::<CropType>()
                .map_err(|e| AppError::UnknownCropType(e.0))?,
        };

        let request = CalculationRequest::new(bytes.clone(), crop_type);
        let result = self
            .service()
            .oneshot(request)
            .await
            .map_err(|e| calculation_service::classify(e, self.timeout))?;

        let record = LaiRecord::from_result(bytes, upload.filename, result);
        tracing::info!(
            "Stored LAI record {} ({}, average {:.2})",
            record.id,
            record.crop_type,
            record.lai_avg
        );
        self.store.insert(record).await
    }

    fn service(&self) -> BoxedCalculationService {
        // A panic while cloning cannot leave the service half-updated.
        match self.service.lock() {
            Ok(service) => service.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
