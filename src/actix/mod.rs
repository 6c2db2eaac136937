use crate::actix::render::{RenderOptions, render_template};
use crate::core::key::AppKey;
use crate::error::TemplateError;

use actix_web::{
  HttpRequest, HttpResponse, Responder, ResponseError,
  body::BoxBody,
  http::{StatusCode, header::ContentType},
};
use std::borrow::Cow;
use tera::Context;

pub mod decorator;
pub mod processors;
pub mod registry;
pub mod render;

impl ResponseError for TemplateError {
  fn status_code(&self) -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
  }

  fn error_response(&self) -> HttpResponse<BoxBody> {
    log::error!("Template rendering error: {:?}", self);
    // The body repeats the message so logs and clients see the same text.
    HttpResponse::build(self.status_code())
      .content_type(ContentType::plaintext())
      .body(self.to_string())
  }
}

/// A template to be rendered when Actix turns it into a response.
///
/// The manual counterpart of the [`template`](crate::template) decorator:
/// handlers build and return it, the environment is resolved from the
/// request when the response is produced.
pub struct Template {
  template_name: String,
  context: Context,
  options: RenderOptions,
}

impl Template {
  pub fn new(template_name: impl Into<String>, context: Context) -> Self {
    Self {
      template_name: template_name.into(),
      context,
      options: RenderOptions::default(),
    }
  }

  pub fn key(mut self, key: AppKey) -> Self {
    self.options.key = key;
    self
  }

  pub fn encoding(mut self, encoding: impl Into<Cow<'static, str>>) -> Self {
    self.options.encoding = encoding.into();
    self
  }

  pub fn status(mut self, status: StatusCode) -> Self {
    self.options.status = status;
    self
  }
}

impl Responder for Template {
  type Body = BoxBody;

  fn respond_to(self, req: &HttpRequest) -> HttpResponse<Self::Body> {
    // Responders are synchronous, so async environments render inline here.
    match render_template(&self.template_name, req, self.context, &self.options) {
      Ok(response) => response,
      Err(e) => e.error_response(),
    }
  }
}
