use crate::core::context::RequestContext;

use actix_web::{
  Error, HttpMessage, HttpRequest,
  dev::{Service, ServiceRequest, ServiceResponse, Transform},
  web,
};
use async_trait::async_trait;
use futures_util::future::{self, LocalBoxFuture};
use serde::Serialize;
use std::{fmt, future::Future, rc::Rc, sync::Arc, task::Poll};
use tera::Context;

/// Produces part of the request-scoped render context.
///
/// Implemented for every `Fn(HttpRequest) -> impl Future<Output = Result<Context, Error>>`,
/// so a plain `async fn` works as a processor.
#[async_trait(?Send)]
pub trait ContextProcessor: Send + Sync + 'static {
  async fn process(&self, req: &HttpRequest) -> Result<Context, Error>;
}

#[async_trait(?Send)]
impl<F, Fut> ContextProcessor for F
where
  F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Context, Error>> + 'static,
{
  async fn process(&self, req: &HttpRequest) -> Result<Context, Error> {
    (self)(req.clone()).await
  }
}

/// The ordered list of processors the middleware runs for every request.
#[derive(Clone, Default)]
pub struct ContextProcessors(Vec<Arc<dyn ContextProcessor>>);

impl ContextProcessors {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a processor. Processors run in the order they were added.
  pub fn with<P: ContextProcessor>(mut self, processor: P) -> Self {
    self.0.push(Arc::new(processor));
    self
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ContextProcessor>> {
    self.0.iter()
  }
}

impl fmt::Debug for ContextProcessors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ContextProcessors").field(&self.0.len()).finish()
  }
}

/// Runs `processors` in order against `req` and collects their output.
///
/// Later keys win; the first error is returned and the rest do not run.
pub(crate) async fn run_processors(req: &HttpRequest, processors: &ContextProcessors) -> Result<RequestContext, Error> {
  let mut scoped = RequestContext::new();
  for processor in processors.iter() {
    let partial = processor.process(req).await?;
    scoped.extend(partial);
  }
  Ok(scoped)
}

#[derive(Serialize)]
struct RequestInfo {
  method: String,
  path: String,
  query_string: String,
  uri: String,
}

/// Exposes the current request to templates as `request`.
///
/// `{{ request.path }}`, `{{ request.method }}`, `{{ request.query_string }}`
/// and `{{ request.uri }}` are available.
pub async fn request_processor(req: HttpRequest) -> Result<Context, Error> {
  let info = RequestInfo {
    method: req.method().to_string(),
    path: req.path().to_string(),
    query_string: req.query_string().to_string(),
    uri: req.uri().to_string(),
  };
  let mut context = Context::new();
  context.insert("request", &info);
  Ok(context)
}

/// Middleware running the application's [`ContextProcessors`] before the handler.
///
/// The processors are read from `web::Data<ContextProcessors>`, which
/// [`TemplateRegistry::configure`](crate::TemplateRegistry::configure)
/// installs. Without that data every request gets an empty scope.
///
/// Apps that are not wrapped still get their processors: decorated handlers
/// run them right before rendering, after the handler itself.
#[derive(Debug, Clone, Default)]
pub struct RunContextProcessors;

impl<S, B> Transform<S, ServiceRequest> for RunContextProcessors
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  B: 'static,
{
  type Response = ServiceResponse<B>;
  type Error = Error;
  type Transform = RunContextProcessorsMiddleware<S>;
  type InitError = ();
  type Future = future::Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    future::ok(RunContextProcessorsMiddleware {
      service: Rc::new(service),
    })
  }
}

pub struct RunContextProcessorsMiddleware<S> {
  service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RunContextProcessorsMiddleware<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  B: 'static,
{
  type Response = ServiceResponse<B>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  fn poll_ready(&self, cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
    self.service.poll_ready(cx)
  }

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let service = self.service.clone();

    Box::pin(async move {
      // 1. Every request starts from its own scope, filled by the processors
      //    in order. The first error aborts the request before the handler runs.
      let scoped = match req.app_data::<web::Data<ContextProcessors>>().cloned() {
        Some(processors) => run_processors(req.request(), &processors).await?,
        None => RequestContext::new(),
      };

      // 2. Hand the scope to the render pipeline through the request extensions.
      req.extensions_mut().insert(scoped);

      service.call(req).await
    })
  }
}
