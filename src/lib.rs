//! # actix-tera
//!
//! Tera templates for Actix Web handlers that return data instead of HTML.
//!
//! ## Features
//!
//! - **Typed registry:** one [`Environment`] per [`AppKey`], installed as app data.
//! - **Decorated handlers:** [`template`] turns a handler returning a context
//!   into one returning a rendered `text/html` response, and passes ready-made
//!   responses and errors through untouched.
//! - **Context processors:** [`RunContextProcessors`] fills a request-scoped
//!   context before the handler runs; handler values win on collisions.
//! - **Helpers:** `url(route=...)` and `static(path=...)` in every template.
//! - **Async rendering:** environments built with `enable_async(true)` render
//!   on the blocking pool instead of the worker thread.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use actix_web::{App, HttpRequest, HttpServer, web};
//! use actix_tera::{
//!   ContextProcessors, DEFAULT_KEY, Environment, RunContextProcessors, TemplateRegistry,
//!   request_processor, template,
//! };
//! use serde_json::{Value, json};
//!
//! // A handler that only returns data; the decorator renders it.
//! async fn index(_req: HttpRequest) -> Value {
//!   json!({"page_title": "Welcome"})
//! }
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!   let mut registry = TemplateRegistry::new();
//!   registry
//!     .setup_with_processors(
//!       DEFAULT_KEY,
//!       Environment::builder()
//!         .templates_glob("templates/**/*.html")
//!         .add_global("site_name", "My Awesome Site")
//!         .static_root_url("/static"),
//!       ContextProcessors::new().with(request_processor),
//!     )
//!     .expect("Failed to build the template environment");
//!
//!   HttpServer::new(move || {
//!     App::new()
//!       .configure(|cfg| registry.configure(cfg))
//!       .wrap(RunContextProcessors::default())
//!       .route("/", web::get().to(template("index.html").handler(index)))
//!   })
//!   .bind(("127.0.0.1", 3000))?
//!   .run()
//!   .await
//! }
//! ```

pub mod actix;
pub mod core;
pub mod error;

pub use crate::actix::Template;
pub use crate::actix::decorator::{HandlerResult, IntoHandlerResult, TemplateHandler, View, template};
pub use crate::actix::processors::{ContextProcessor, ContextProcessors, RunContextProcessors, request_processor};
pub use crate::actix::registry::TemplateRegistry;
pub use crate::actix::render::{
  RenderOptions, build_response, get_env, render_string, render_string_async, render_template,
  render_template_async,
};
pub use crate::core::context::{IntoContext, RequestContext};
pub use crate::core::env::{Environment, EnvironmentBuilder};
pub use crate::core::key::{AppKey, DEFAULT_KEY};
pub use crate::error::{Result, TemplateError};

#[doc(hidden)]
pub use async_trait::async_trait;
