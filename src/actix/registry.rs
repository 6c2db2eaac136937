use crate::actix::processors::ContextProcessors;
use crate::core::env::{Environment, EnvironmentBuilder};
use crate::core::key::AppKey;
use crate::error::Result;

use actix_web::web::{self, ServiceConfig};
use std::collections::HashMap;

/// Application-level map of template environments, keyed by [`AppKey`].
///
/// Build it before starting the server, then install it into every app with
/// [`TemplateRegistry::configure`]. Renders look environments up through the
/// request, so nothing is resolved when handlers are registered.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
  environments: HashMap<AppKey, Environment>,
  processors: ContextProcessors,
}

impl TemplateRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds an environment and registers it under `key`.
  ///
  /// Registering a key twice replaces the previous environment; templates
  /// only the old one knew are no longer resolvable.
  pub fn setup(&mut self, key: AppKey, builder: EnvironmentBuilder) -> Result<Environment> {
    self.setup_with_processors(key, builder, ContextProcessors::new())
  }

  /// Like [`setup`](Self::setup), also installing context processors.
  ///
  /// A non-empty `processors` replaces the application's processor list, an
  /// empty one leaves the current list untouched. Processors only run when
  /// [`RunContextProcessors`](crate::RunContextProcessors) wraps the app.
  pub fn setup_with_processors(
    &mut self,
    key: AppKey,
    builder: EnvironmentBuilder,
    processors: ContextProcessors,
  ) -> Result<Environment> {
    let env = builder.build()?;

    if self.environments.insert(key, env.clone()).is_some() {
      log::warn!("Replacing the template environment registered under '{}'", key);
    } else {
      log::debug!("Registered template environment under '{}'", key);
    }

    if !processors.is_empty() {
      log::debug!("Installing {} context processor(s)", processors.len());
      self.processors = processors;
    }

    Ok(env)
  }

  /// The environment registered under `key`, if any.
  pub fn get(&self, key: AppKey) -> Option<&Environment> {
    self.environments.get(&key)
  }

  pub fn context_processors(&self) -> &ContextProcessors {
    &self.processors
  }

  /// Installs the registry and the processor list as application data.
  ///
  /// ```rust,no_run
  /// # use actix_web::{App, HttpServer};
  /// # use actix_tera::{DEFAULT_KEY, Environment, RunContextProcessors, TemplateRegistry};
  /// # async fn run() -> std::io::Result<()> {
  /// let mut registry = TemplateRegistry::new();
  /// registry
  ///   .setup(DEFAULT_KEY, Environment::builder().templates_glob("templates/**/*.html"))
  ///   .expect("invalid templates");
  ///
  /// HttpServer::new(move || {
  ///   App::new()
  ///     .configure(|cfg| registry.configure(cfg))
  ///     .wrap(RunContextProcessors::default())
  /// })
  /// .bind(("127.0.0.1", 8080))?
  /// .run()
  /// .await
  /// # }
  /// ```
  pub fn configure(&self, cfg: &mut ServiceConfig) {
    cfg.app_data(web::Data::new(self.clone()));
    cfg.app_data(web::Data::new(self.processors.clone()));
  }
}
