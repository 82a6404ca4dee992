use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::Semaphore;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::util::BoxCloneService;
use tower::{BoxError, Service, ServiceBuilder};

use crate::config::ServiceConfig;
use crate::error::{AppError, PipelineError};
use crate::pipeline::{CalculationRequest, CalculationResult, LaiPipeline};

pub type BoxedCalculationService = BoxCloneService<CalculationRequest, CalculationResult, BoxError>;

/// Runs each calculation on the blocking thread pool so the async caller is
/// never stalled by clustering. At most `max_concurrent` workers run at once;
/// a worker keeps its permit until it finishes, even after the caller gave up.
#[derive(Clone)]
pub struct CalculationService {
    pipeline: Arc<LaiPipeline>,
    permits: Arc<Semaphore>,
    running: Arc<AtomicUsize>,
}

impl CalculationService {
    pub fn new(pipeline: Arc<LaiPipeline>, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Blocking workers currently computing, including abandoned ones.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }
}

struct RunningGuard(Arc<AtomicUsize>);

impl RunningGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Service<CalculationRequest> for CalculationService {
    type Response = CalculationResult;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: CalculationRequest) -> Self::Future {
        let pipeline = self.pipeline.clone();
        let permits = self.permits.clone();
        let running = self.running.clone();

        Box::pin(async move {
            let permit = permits.acquire_owned().await?;
            let result = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _running = RunningGuard::enter(running);
                pipeline.compute_request(request)
            })
            .await?;
            Ok(result?)
        })
    }
}

pub struct CalculationServiceBuilder {
    pipeline: Arc<LaiPipeline>,
    timeout: Option<Duration>,
    max_concurrent: usize,
}

impl CalculationServiceBuilder {
    pub fn new(pipeline: Arc<LaiPipeline>) -> Self {
        Self {
            pipeline,
            timeout: None,
            max_concurrent: crate::config::MAX_CONCURRENT_CALCULATIONS,
        }
    }

    // Applies the timeout and concurrency limit from the configuration.
    pub fn config(self, config: &ServiceConfig) -> Self {
        let builder = self.max_concurrent(config.max_concurrent);
        match config.timeout() {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn build(self) -> BoxedCalculationService {
        let service = ServiceBuilder::new()
            .option_layer(self.timeout.map(TimeoutLayer::new))
            .service(CalculationService::new(self.pipeline, self.max_concurrent));

        BoxCloneService::new(service)
    }
}

/// Maps whatever the service stack returned onto the boundary error type.
pub fn classify(error: BoxError, timeout: Option<Duration>) -> AppError {
    let error = match error.downcast::<PipelineError>() {
        Ok(pipeline) => return AppError::Pipeline(*pipeline),
        Err(other) => other,
    };
    if error.is::<Elapsed>() {
        return AppError::Timeout(timeout.unwrap_or_default());
    }
    match error.downcast::<tokio::task::JoinError>() {
        Ok(join) if join.is_panic() => AppError::Worker("calculation panicked".to_string()),
        Ok(join) => AppError::Worker(join.to_string()),
        Err(other) => AppError::Worker(other.to_string()),
    }
}
