//! Turning handlers that return context data into HTML handlers.
//!
//! A decorated handler returns anything implementing [`IntoHandlerResult`]:
//! a [`tera::Context`], a JSON object, `()` for an empty context, or a
//! ready-made [`HttpResponse`]. Contexts are rendered with the configured
//! template, responses and errors are returned as they are.
//!
//! Three handler shapes are supported, chosen by the constructor:
//!
//! * [`TemplateHandler::handler`] for free functions taking any extractors,
//! * [`TemplateHandler::method`] for methods bound to a shared instance,
//! * [`TemplateHandler::view`] for class-based [`View`]s.
//!
//! Anything else is rejected when the route is registered, at compile time:
//!
//! ```rust,compile_fail
//! use actix_tera::template;
//!
//! // `u8` is not an extractor, so this is not a handler.
//! async fn index(id: u8) -> tera::Context {
//!   tera::Context::new()
//! }
//!
//! let _ = template("index.html").handler(index);
//! ```

use crate::actix::processors::{ContextProcessors, run_processors};
use crate::actix::render::{RenderOptions, render_template_async};
use crate::core::context::{IntoContext, RequestContext};
use crate::core::key::AppKey;
use crate::error::TemplateError;

use actix_web::{
  Error, FromRequest, Handler, HttpMessage, HttpRequest, HttpResponse,
  http::{Method, StatusCode},
  web,
};
use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;
use serde_json::Value;
use std::borrow::Cow;
use std::future::Future;
use std::sync::{Arc, Once};
use tera::Context;

static MISSING_MIDDLEWARE: Once = Once::new();

/// What a decorated handler produced.
#[derive(Debug)]
pub enum HandlerResult {
  /// Data to render with the handler's template.
  Context(Context),
  /// A finished response; the template is not touched.
  Response(HttpResponse),
}

impl From<Context> for HandlerResult {
  fn from(context: Context) -> Self {
    HandlerResult::Context(context)
  }
}

impl From<HttpResponse> for HandlerResult {
  fn from(response: HttpResponse) -> Self {
    HandlerResult::Response(response)
  }
}

impl TryFrom<Value> for HandlerResult {
  type Error = TemplateError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    value.into_context().map(HandlerResult::Context)
  }
}

/// Conversion of a handler's output into a [`HandlerResult`].
pub trait IntoHandlerResult {
  fn into_handler_result(self) -> Result<HandlerResult, Error>;
}

impl IntoHandlerResult for HandlerResult {
  fn into_handler_result(self) -> Result<HandlerResult, Error> {
    Ok(self)
  }
}

impl IntoHandlerResult for Context {
  fn into_handler_result(self) -> Result<HandlerResult, Error> {
    Ok(HandlerResult::Context(self))
  }
}

impl IntoHandlerResult for HttpResponse {
  fn into_handler_result(self) -> Result<HandlerResult, Error> {
    Ok(HandlerResult::Response(self))
  }
}

/// `null` means no data and renders with an empty context.
impl IntoHandlerResult for Value {
  fn into_handler_result(self) -> Result<HandlerResult, Error> {
    match self {
      Value::Null => Ok(HandlerResult::Context(Context::new())),
      other => Ok(HandlerResult::try_from(other)?),
    }
  }
}

/// A handler returning nothing renders its template with an empty context.
impl IntoHandlerResult for () {
  fn into_handler_result(self) -> Result<HandlerResult, Error> {
    Ok(HandlerResult::Context(Context::new()))
  }
}

impl<T: IntoHandlerResult> IntoHandlerResult for Option<T> {
  fn into_handler_result(self) -> Result<HandlerResult, Error> {
    match self {
      Some(inner) => inner.into_handler_result(),
      None => Ok(HandlerResult::Context(Context::new())),
    }
  }
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
  T: IntoHandlerResult,
  E: Into<Error>,
{
  fn into_handler_result(self) -> Result<HandlerResult, Error> {
    self.map_err(Into::into)?.into_handler_result()
  }
}

/// A class-based view: built from the request, dispatched by HTTP method.
///
/// Methods that are not overridden answer `405 Method Not Allowed`.
///
/// ```rust
/// use actix_tera::{HandlerResult, View, async_trait, template};
/// use actix_web::{Error, HttpRequest, web};
///
/// struct Profile {
///   request: HttpRequest,
/// }
///
/// #[async_trait(?Send)]
/// impl View for Profile {
///   fn new(request: HttpRequest) -> Self {
///     Self { request }
///   }
///
///   fn request(&self) -> &HttpRequest {
///     &self.request
///   }
///
///   async fn get(&self) -> Result<HandlerResult, Error> {
///     let mut context = tera::Context::new();
///     context.insert("path", self.request.path());
///     Ok(context.into())
///   }
/// }
///
/// let route = web::route().to(template("profile.html").view::<Profile>());
/// ```
#[async_trait(?Send)]
pub trait View: Sized + 'static {
  fn new(request: HttpRequest) -> Self;

  fn request(&self) -> &HttpRequest;

  async fn get(&self) -> Result<HandlerResult, Error> {
    Ok(method_not_allowed())
  }

  async fn post(&self) -> Result<HandlerResult, Error> {
    Ok(method_not_allowed())
  }

  async fn put(&self) -> Result<HandlerResult, Error> {
    Ok(method_not_allowed())
  }

  async fn patch(&self) -> Result<HandlerResult, Error> {
    Ok(method_not_allowed())
  }

  async fn delete(&self) -> Result<HandlerResult, Error> {
    Ok(method_not_allowed())
  }

  /// Calls the method matching the request. `HEAD` is served by `get`.
  async fn dispatch(&self) -> Result<HandlerResult, Error> {
    let method = self.request().method().clone();
    if method == Method::GET || method == Method::HEAD {
      self.get().await
    } else if method == Method::POST {
      self.post().await
    } else if method == Method::PUT {
      self.put().await
    } else if method == Method::PATCH {
      self.patch().await
    } else if method == Method::DELETE {
      self.delete().await
    } else {
      Ok(method_not_allowed())
    }
  }
}

fn method_not_allowed() -> HandlerResult {
  HandlerResult::Response(HttpResponse::MethodNotAllowed().finish())
}

/// Starts decorating a handler with the template `template_name`.
///
/// ```rust
/// use actix_tera::template;
/// use actix_web::{HttpRequest, http::StatusCode, web};
/// use serde_json::{Value, json};
///
/// async fn index(_req: HttpRequest) -> Value {
///   json!({"head": "HEAD", "text": "text"})
/// }
///
/// let route = web::get().to(template("index.html").status(StatusCode::CREATED).handler(index));
/// ```
pub fn template(template_name: impl Into<String>) -> TemplateHandler {
  TemplateHandler {
    template_name: template_name.into(),
    options: RenderOptions::default(),
  }
}

/// A template plus response settings, ready to wrap a handler.
///
/// Template names are looked up per request, never when decorating.
#[derive(Clone, Debug)]
pub struct TemplateHandler {
  template_name: String,
  options: RenderOptions,
}

type TemplatedFuture = LocalBoxFuture<'static, Result<HttpResponse, Error>>;

impl TemplateHandler {
  /// Renders with the environment registered under `key`.
  pub fn key(mut self, key: AppKey) -> Self {
    self.options.key = key;
    self
  }

  /// Charset announced in the `Content-Type` header. Defaults to `utf-8`.
  pub fn encoding(mut self, encoding: impl Into<Cow<'static, str>>) -> Self {
    self.options.encoding = encoding.into();
    self
  }

  /// Status of rendered responses. Defaults to `200 OK`.
  ///
  /// Responses returned by the handler itself keep their own status.
  pub fn status(mut self, status: StatusCode) -> Self {
    self.options.status = status;
    self
  }

  /// Wraps a free function taking any Actix extractors.
  pub fn handler<F, Args>(self, handler: F) -> impl Fn(HttpRequest, Args) -> TemplatedFuture + Clone + 'static
  where
    F: Handler<Args>,
    F::Future: 'static,
    F::Output: IntoHandlerResult + 'static,
    Args: FromRequest + 'static,
  {
    log::debug!("Decorating function handler with template '{}'", self.template_name);
    let this = Arc::new(self);

    move |req: HttpRequest, args: Args| {
      let this = Arc::clone(&this);
      let output = handler.call(args);
      Box::pin(async move {
        let result = output.await.into_handler_result()?;
        this.finish(req, result).await
      })
    }
  }

  /// Wraps a method bound to a shared `instance`.
  pub fn method<S, F, Fut>(self, instance: Arc<S>, method: F) -> impl Fn(HttpRequest) -> TemplatedFuture + Clone + 'static
  where
    S: 'static,
    F: Fn(Arc<S>, HttpRequest) -> Fut + Clone + 'static,
    Fut: Future + 'static,
    Fut::Output: IntoHandlerResult,
  {
    log::debug!("Decorating method handler with template '{}'", self.template_name);
    let this = Arc::new(self);

    move |req: HttpRequest| {
      let this = Arc::clone(&this);
      let output = method(Arc::clone(&instance), req.clone());
      Box::pin(async move {
        let result = output.await.into_handler_result()?;
        this.finish(req, result).await
      })
    }
  }

  /// Serves a class-based [`View`], rendering whatever its method returns.
  pub fn view<V: View>(self) -> impl Fn(HttpRequest) -> TemplatedFuture + Clone + 'static {
    log::debug!(
      "Decorating view {} with template '{}'",
      std::any::type_name::<V>(),
      self.template_name
    );
    let this = Arc::new(self);

    move |req: HttpRequest| {
      let this = Arc::clone(&this);
      Box::pin(async move {
        let view = V::new(req);
        let result = view.dispatch().await?;
        let req = view.request().clone();
        this.finish(req, result).await
      })
    }
  }

  async fn finish(&self, req: HttpRequest, result: HandlerResult) -> Result<HttpResponse, Error> {
    let context = match result {
      HandlerResult::Response(response) => return Ok(response),
      HandlerResult::Context(context) => context,
    };
    run_processors_without_middleware(&req).await?;
    Ok(render_template_async(&self.template_name, &req, context, &self.options).await?)
  }
}

// Runs the app's processors when `RunContextProcessors` did not.
async fn run_processors_without_middleware(req: &HttpRequest) -> Result<(), Error> {
  if req.extensions().contains::<RequestContext>() {
    return Ok(());
  }
  let Some(processors) = req.app_data::<web::Data<ContextProcessors>>().cloned() else {
    return Ok(());
  };
  if processors.is_empty() {
    return Ok(());
  }

  MISSING_MIDDLEWARE.call_once(|| {
    log::warn!(
      "Context processors are registered but the app is not wrapped with RunContextProcessors, \
       running them before rendering instead"
    );
  });
  let scoped = run_processors(req, &processors).await?;
  req.extensions_mut().insert(scoped);
  Ok(())
}
