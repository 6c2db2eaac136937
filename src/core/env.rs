use crate::core::helpers::{StaticUrl, UrlFor, escape_html};
use crate::error::{Result, TemplateError};

use actix_web::dev::ResourceDef;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Context, Filter, Function, Tera};

/// A configured template environment.
///
/// Cheap to clone: all clones share the same Tera instance. It is created
/// with [`Environment::builder`] and usually registered in a
/// [`TemplateRegistry`](crate::TemplateRegistry) rather than used directly.
#[derive(Clone, Debug)]
pub struct Environment {
  /// The Tera instance, wrapped for thread-safe access and mutability (for reloads).
  pub(crate) tera: Arc<RwLock<Tera>>,
  /// Globals shared by every render, lowest precedence.
  pub(crate) global_context: Arc<Context>,
  /// Templates added from strings, re-added after a reload.
  raw_templates: Arc<Vec<(String, String)>>,
  /// Renders happen on the blocking pool instead of the worker thread.
  enable_async: bool,
}

impl Environment {
  /// Creates a new `EnvironmentBuilder` to configure and build an `Environment`.
  pub fn builder() -> EnvironmentBuilder {
    EnvironmentBuilder::new()
  }

  /// Whether renders should be moved off the worker thread.
  pub fn is_async(&self) -> bool {
    self.enable_async
  }

  /// Returns `true` if a template with this exact name is loaded.
  pub fn has_template(&self, name: &str) -> bool {
    self.tera.read().get_template(name).is_ok()
  }

  /// Renders `tpl` with the globals overlaid by `context`.
  ///
  /// An unknown `tpl` is [`TemplateError::TemplateNotFound`]. Engine errors
  /// (syntax, undefined variables, failing filters) are returned as
  /// [`TemplateError::Tera`] unchanged.
  pub fn render_with_context(&self, tpl: &str, context: Context) -> Result<String> {
    let tera = self.tera.read();
    // Checked under the same guard as the render, a reload cannot slip in between.
    if tera.get_template(tpl).is_err() {
      return Err(TemplateError::TemplateNotFound { name: tpl.to_string() });
    }

    // 1. Start with a clone of our base globals.
    let mut final_context = (*self.global_context).clone();

    // 2. Extend it with the context the caller supplied, which wins on collisions.
    final_context.extend(context);

    // 3. Render.
    Ok(tera.render(tpl, &final_context)?)
  }

  /// Re-reads every template matched by the builder's glob.
  ///
  /// Names are resolved at render time, so handlers pick up the new sources on
  /// their next request. Fails for environments built without a glob.
  pub fn full_reload(&self) -> Result<()> {
    let mut tera = self.tera.write();
    tera.full_reload()?;
    // Tera only keeps what it read from the glob.
    if !self.raw_templates.is_empty() {
      tera.add_raw_templates(self.raw_templates.iter().map(|(name, source)| (name, source)))?;
    }
    log::info!("Reloaded {} template(s)", tera.get_template_names().count());
    Ok(())
  }
}

/// A builder for creating a configured `Environment`.
pub struct EnvironmentBuilder {
  templates_glob: Option<String>,
  raw_templates: Vec<(String, String)>,
  globals: Context,
  autoescape: bool,
  default_helpers: bool,
  enable_async: bool,
  static_root_url: Option<String>,
  routes: HashMap<String, ResourceDef>,
  // Filters and functions are registered once the Tera instance exists.
  registrations: Vec<Box<dyn FnOnce(&mut Tera)>>,
  tera_configurator: Option<Box<dyn FnOnce(&mut Tera)>>,
}

impl Default for EnvironmentBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl EnvironmentBuilder {
  /// Creates a builder with autoescaping and default helpers on, sync rendering
  /// and no templates.
  pub fn new() -> Self {
    Self {
      templates_glob: None,
      raw_templates: Vec::new(),
      globals: Context::new(),
      autoescape: true,
      default_helpers: true,
      enable_async: false,
      static_root_url: None,
      routes: HashMap::new(),
      registrations: Vec::new(),
      tera_configurator: None,
    }
  }

  /// Loads templates from a glob pattern (e.g. `"templates/**/*.html"`).
  pub fn templates_glob(mut self, glob: &str) -> Self {
    self.templates_glob = Some(glob.to_string());
    self
  }

  /// Adds a template from a string, addressed by `name`.
  ///
  /// Raw templates are added after the glob, so a raw template replaces a file
  /// with the same name.
  pub fn raw_template<N: Into<String>, S: Into<String>>(mut self, name: N, source: S) -> Self {
    self.raw_templates.push((name.into(), source.into()));
    self
  }

  /// Adds a global variable that will be available to all templates.
  ///
  /// This can be called multiple times to add multiple globals.
  ///
  /// # Arguments
  ///
  /// * `key` - The name of the variable in the template (e.g., "site_name").
  /// * `value` - Any value that can be serialized (e.g., a string, a number, a struct).
  pub fn add_global<S: Into<String>, T: Serialize>(mut self, key: S, value: T) -> Self {
    self.globals.insert(key.into(), &value);
    self
  }

  /// Registers a custom filter, usable as `{{ value | name }}`.
  pub fn filter<F: Filter + 'static>(mut self, name: &str, filter: F) -> Self {
    let name = name.to_string();
    self.registrations.push(Box::new(move |tera| tera.register_filter(&name, filter)));
    self
  }

  /// Registers a custom global function, usable as `{{ name(arg=...) }}`.
  pub fn function<F: Function + 'static>(mut self, name: &str, function: F) -> Self {
    let name = name.to_string();
    self.registrations.push(Box::new(move |tera| tera.register_function(&name, function)));
    self
  }

  /// Escapes every printed value unless marked `safe`. On by default.
  ///
  /// Applies to all templates regardless of their file extension.
  pub fn autoescape(mut self, enabled: bool) -> Self {
    self.autoescape = enabled;
    self
  }

  /// Installs the `url` and `static` functions. On by default.
  pub fn default_helpers(mut self, enabled: bool) -> Self {
    self.default_helpers = enabled;
    self
  }

  /// Renders on Actix's blocking thread pool instead of the worker thread.
  ///
  /// Worth it for large templates, where a render would otherwise stall every
  /// other request served by the same worker.
  pub fn enable_async(mut self, enabled: bool) -> Self {
    self.enable_async = enabled;
    self
  }

  /// Base URL used by the `static` helper, e.g. `"/static"` or a CDN origin.
  pub fn static_root_url(mut self, url: &str) -> Self {
    self.static_root_url = Some(url.to_string());
    self
  }

  /// Makes a named route pattern reversible with the `url` helper.
  ///
  /// Patterns use Actix syntax: `"/user/{name}"`, `"/items/{id:\\d+}"` or
  /// `"/files/{tail}*"`.
  ///
  /// # Panics
  ///
  /// Panics on a malformed pattern, like Actix route registration does.
  pub fn route(mut self, name: &str, pattern: &str) -> Self {
    self.routes.insert(name.to_string(), ResourceDef::new(pattern));
    self
  }

  /// Provides a closure to run for advanced configuration of the `Tera` instance.
  ///
  /// This is the escape hatch for power users to register testers or modify
  /// Tera settings before the environment is finalized. It runs last.
  pub fn configure_tera<F>(mut self, configurator: F) -> Self
  where
    F: FnOnce(&mut Tera) + 'static,
  {
    self.tera_configurator = Some(Box::new(configurator));
    self
  }

  /// Consumes the builder to construct the final `Environment`.
  pub fn build(self) -> Result<Environment> {
    // 1. Create the initial Tera instance.
    let mut tera = match &self.templates_glob {
      Some(glob) => Tera::new(glob)?,
      None => Tera::default(),
    };
    if !self.raw_templates.is_empty() {
      tera.add_raw_templates(self.raw_templates.iter().map(|(name, source)| (name, source)))?;
    }

    // 2. Escaping: an empty suffix matches every template name.
    if self.autoescape {
      tera.autoescape_on(vec![""]);
      tera.set_escape_fn(escape_html);
    } else {
      tera.autoescape_on(vec![]);
    }

    // 3. Helpers first, so user functions of the same name replace them.
    if self.default_helpers {
      tera.register_function("url", UrlFor::new(self.routes));
      tera.register_function("static", StaticUrl::new(self.static_root_url));
    }
    for register in self.registrations {
      register(&mut tera);
    }

    // 4. Run the power-user configuration closure if it exists.
    if let Some(configurator) = self.tera_configurator {
      configurator(&mut tera);
    }

    log::debug!(
      "Built template environment with {} template(s), async: {}",
      tera.get_template_names().count(),
      self.enable_async
    );

    Ok(Environment {
      tera: Arc::new(RwLock::new(tera)),
      global_context: Arc::new(self.globals),
      raw_templates: Arc::new(self.raw_templates),
      enable_async: self.enable_async,
    })
  }
}
