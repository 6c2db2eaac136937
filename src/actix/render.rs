use crate::actix::registry::TemplateRegistry;
use crate::core::context::{IntoContext, RequestContext, merge};
use crate::core::env::Environment;
use crate::core::key::{AppKey, DEFAULT_KEY};
use crate::error::{Result, TemplateError};

use actix_web::{HttpMessage, HttpRequest, HttpResponse, HttpResponseBuilder, http::StatusCode, web};
use std::borrow::Cow;
use tera::Context;

/// How a rendered template is turned into a response.
#[derive(Clone, Debug)]
pub struct RenderOptions {
  /// Environment to render with.
  pub key: AppKey,
  /// Charset announced in the `Content-Type` header.
  pub encoding: Cow<'static, str>,
  pub status: StatusCode,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      key: DEFAULT_KEY,
      encoding: Cow::Borrowed("utf-8"),
      status: StatusCode::OK,
    }
  }
}

/// Looks up the environment registered under `key` for the request's app.
pub fn get_env(req: &HttpRequest, key: AppKey) -> Option<Environment> {
  req
    .app_data::<web::Data<TemplateRegistry>>()
    .and_then(|registry| registry.get(key))
    .cloned()
}

/// Finds the environment and template and builds the final context.
///
/// Checks happen in a fixed order: environment, template name, context
/// shape. The returned context is the request-scoped context overlaid by
/// `context`.
pub(crate) fn resolve(
  template_name: &str,
  req: &HttpRequest,
  context: impl IntoContext,
  key: AppKey,
) -> Result<(Environment, Context)> {
  let env = get_env(req, key).ok_or(TemplateError::NotInitialized { key })?;

  if !env.has_template(template_name) {
    return Err(TemplateError::TemplateNotFound {
      name: template_name.to_string(),
    });
  }

  let context = context.into_context()?;
  let merged = merge(req.extensions().get::<RequestContext>(), context);
  Ok((env, merged))
}

async fn render_in(env: Environment, template_name: &str, context: Context) -> Result<String> {
  if !env.is_async() {
    return env.render_with_context(template_name, context);
  }

  let template_name = template_name.to_string();
  web::block(move || env.render_with_context(&template_name, context)).await?
}

/// Renders a template to a string on the current thread.
pub fn render_string(
  template_name: &str,
  req: &HttpRequest,
  context: impl IntoContext,
  key: AppKey,
) -> Result<String> {
  let (env, context) = resolve(template_name, req, context, key)?;
  env.render_with_context(template_name, context)
}

/// Renders a template to a string, on the blocking pool if the environment
/// was built with `enable_async(true)`.
pub async fn render_string_async(
  template_name: &str,
  req: &HttpRequest,
  context: impl IntoContext,
  key: AppKey,
) -> Result<String> {
  let (env, context) = resolve(template_name, req, context, key)?;
  render_in(env, template_name, context).await
}

/// Starts an HTML response: status and `Content-Type: text/html; charset=<encoding>`.
///
/// The body is attached once rendering has finished.
pub fn build_response(status: StatusCode, encoding: &str) -> HttpResponseBuilder {
  let mut builder = HttpResponse::build(status);
  builder.content_type(format!("text/html; charset={encoding}"));
  builder
}

/// Renders a template into a complete HTML response.
pub fn render_template(
  template_name: &str,
  req: &HttpRequest,
  context: impl IntoContext,
  options: &RenderOptions,
) -> Result<HttpResponse> {
  let mut response = build_response(options.status, &options.encoding);
  let text = render_string(template_name, req, context, options.key)?;
  Ok(response.body(text))
}

/// Async counterpart of [`render_template`].
pub async fn render_template_async(
  template_name: &str,
  req: &HttpRequest,
  context: impl IntoContext,
  options: &RenderOptions,
) -> Result<HttpResponse> {
  let mut response = build_response(options.status, &options.encoding);
  let text = render_string_async(template_name, req, context, options.key).await?;
  Ok(response.body(text))
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::{body::to_bytes, http::header::CONTENT_TYPE, test::TestRequest};
  use serde_json::json;

  const TEMPLATE: &str = "<html><body><h1>{{head}}</h1>{{text}}</body></html>";

  fn request_with(registry: TemplateRegistry) -> HttpRequest {
    TestRequest::default().app_data(web::Data::new(registry)).to_http_request()
  }

  fn registry(enable_async: bool) -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry
      .setup(
        DEFAULT_KEY,
        Environment::builder()
          .raw_template("tmpl.html", TEMPLATE)
          .enable_async(enable_async),
      )
      .unwrap();
    registry
  }

  fn head_text() -> serde_json::Value {
    json!({"head": "HEAD", "text": "text"})
  }

  #[actix_rt::test]
  async fn render_string_sync_and_async() {
    for enable_async in [false, true] {
      let req = request_with(registry(enable_async));

      let sync = render_string("tmpl.html", &req, head_text(), DEFAULT_KEY).unwrap();
      let not_sync = render_string_async("tmpl.html", &req, head_text(), DEFAULT_KEY)
        .await
        .unwrap();

      assert_eq!(sync, "<html><body><h1>HEAD</h1>text</body></html>");
      assert_eq!(sync, not_sync);
    }
  }

  #[actix_rt::test]
  async fn render_template_sets_headers_and_status() {
    let req = request_with(registry(false));
    let options = RenderOptions {
      status: StatusCode::NOT_FOUND,
      ..RenderOptions::default()
    };

    let response = render_template("tmpl.html", &req, head_text(), &options).unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/html; charset=utf-8");
    let body = to_bytes(response.into_body()).await.unwrap();
    assert_eq!(body, "<html><body><h1>HEAD</h1>text</body></html>");
  }

  #[actix_rt::test]
  async fn render_template_async_uses_custom_encoding() {
    let req = request_with(registry(true));
    let options = RenderOptions {
      encoding: Cow::Borrowed("latin-1"),
      ..RenderOptions::default()
    };

    let response = render_template_async("tmpl.html", &req, head_text(), &options)
      .await
      .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/html; charset=latin-1");
  }

  #[test]
  fn not_initialized_names_the_key() {
    let req = TestRequest::default().to_http_request();

    let err = render_string("tmpl.html", &req, Context::new(), DEFAULT_KEY).unwrap_err();

    assert_eq!(
      err.to_string(),
      "Template engine is not initialized, call TemplateRegistry::setup(..., app_key=tera_environment) first"
    );
  }

  #[test]
  fn not_initialized_for_unregistered_key() {
    let req = request_with(registry(false));

    let err = render_string("tmpl.html", &req, Context::new(), AppKey::new("emails")).unwrap_err();

    assert!(matches!(err, TemplateError::NotInitialized { key } if key.as_str() == "emails"));
    assert!(err.to_string().contains("app_key=emails"));
  }

  #[test]
  fn template_not_found_message() {
    let req = request_with(registry(false));

    let err = render_string("template", &req, Context::new(), DEFAULT_KEY).unwrap_err();

    assert_eq!(err.to_string(), "Template 'template' not found");
  }

  #[test]
  fn non_mapping_context_is_rejected() {
    let req = request_with(registry(false));

    let err = render_string("tmpl.html", &req, json!(123), DEFAULT_KEY).unwrap_err();

    assert_eq!(err.to_string(), "context should be mapping, not integer");
  }

  #[test]
  fn request_scoped_context_is_merged_under_handler_context() {
    let req = request_with(registry(false));
    let mut scoped = RequestContext::new();
    scoped.extend(json!({"head": "scoped", "text": "scoped"}).into_context().unwrap());
    req.extensions_mut().insert(scoped);

    let text = render_string("tmpl.html", &req, json!({"head": "HEAD"}), DEFAULT_KEY).unwrap();

    assert_eq!(text, "<html><body><h1>HEAD</h1>scoped</body></html>");
  }
}
