//! Error types for the CLI runtime.

use std::sync::Arc;

use cobalt_config::DescriptorError;
use thiserror::Error;

use crate::lifecycle::{Failure, GENERIC_FAILURE_EXIT_CODE, LifecycleError};
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("invalid service configuration: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("lifecycle command failed: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl AppError {
    /// Exit code reported when the runtime aborts with this error.
    pub(crate) fn exit_code(&self) -> u8 {
        match self {
            Self::Descriptor(_) => Failure::NotConfigured.exit_code(),
            Self::Lifecycle(error) => error.failure().exit_code(),
            Self::LoadConfiguration(_) | Self::Telemetry(_) => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}
