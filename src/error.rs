use actix_web::error::BlockingError;
use thiserror::Error;

use crate::core::key::AppKey;

/// A specialized `Result` type for `actix-tera` operations.
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;

/// The primary error type for all `actix-tera` operations.
///
/// Every variant is reported to the client as `500 Internal Server Error` with
/// the message as body, see the `ResponseError` impl in [`crate::actix`].
#[derive(Debug, Error)]
pub enum TemplateError {
  /// No environment was registered under the key used for rendering.
  #[error("Template engine is not initialized, call TemplateRegistry::setup(..., app_key={key}) first")]
  NotInitialized { key: AppKey },

  /// The environment does not know a template with this name.
  #[error("Template '{name}' not found")]
  TemplateNotFound { name: String },

  /// A render context was built from something that is not a mapping.
  #[error("context should be mapping, not {found}")]
  InvalidContext { found: &'static str },

  /// An error originating from the `tera` templating engine.
  #[error(transparent)]
  Tera(#[from] tera::Error),

  /// The blocking pool used by async environments went away mid-render.
  #[error("Template rendering was cancelled: {0}")]
  Blocking(#[from] BlockingError),
}
