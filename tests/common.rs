#![allow(dead_code)]

use actix_tera::{DEFAULT_KEY, Environment, EnvironmentBuilder, TemplateRegistry};
use actix_web::{dev::ServiceResponse, test};

pub const TEMPLATE: &str = "<html><body><h1>{{head}}</h1>{{text}}</body></html>";

// Builder holding the given templates under their names.
pub fn builder(templates: &[(&str, &str)]) -> EnvironmentBuilder {
  templates
    .iter()
    .fold(Environment::builder(), |builder, (name, source)| builder.raw_template(*name, *source))
}

// Registry with one environment under the default key.
pub fn registry(builder: EnvironmentBuilder) -> TemplateRegistry {
  let mut registry = TemplateRegistry::new();
  registry.setup(DEFAULT_KEY, builder).unwrap();
  registry
}

pub async fn body_string(resp: ServiceResponse) -> String {
  let body = test::read_body(resp).await;
  std::str::from_utf8(&body).unwrap().to_string()
}
