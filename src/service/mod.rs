pub mod calculation_service;

pub use calculation_service::{BoxedCalculationService, CalculationService, CalculationServiceBuilder, classify};
