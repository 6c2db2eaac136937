//! Global functions installed into every environment built with default
//! helpers, and the HTML escaper used when autoescaping.

use actix_web::dev::ResourceDef;
use askama_escape::{Html, escape};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use std::collections::HashMap;

// Unreserved characters and `/` pass through, so tail segments such as
// `{path}*` keep their slashes.
const PATH_PARAM_SET: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'_')
  .remove(b'.')
  .remove(b'-')
  .remove(b'~')
  .remove(b'/');

/// Name of the argument that selects the route in `url(...)`.
pub(crate) const ROUTE_ARG: &str = "route";
/// Name of the argument carrying the query string in `url(...)`.
pub(crate) const QUERY_ARG: &str = "query_";

/// Escapes `<`, `>`, `&`, `"` and `'` for safe inclusion in HTML.
///
/// Installed as Tera's escape function. Unlike Tera's default escaper it
/// leaves `/` alone.
pub fn escape_html(input: &str) -> String {
  escape(input, Html).to_string()
}

/// Short, template-facing name of a value's type, used in error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(n) if n.is_f64() => "float",
    Value::Number(_) => "integer",
    Value::String(_) => "string",
    Value::Array(_) => "sequence",
    Value::Object(_) => "mapping",
  }
}

/// The `url` template function.
///
/// Reverses a named route pattern registered on the environment builder:
/// `{{ url(route="user", name="john") }}` gives `/user/john` for the pattern
/// `/user/{name}`. An optional `query_` argument (string or mapping) is
/// appended as the query string.
pub(crate) struct UrlFor {
  routes: HashMap<String, ResourceDef>,
}

impl UrlFor {
  pub(crate) fn new(routes: HashMap<String, ResourceDef>) -> Self {
    Self { routes }
  }

  fn reverse(&self, route: &str, parts: &HashMap<&str, String>) -> tera::Result<String> {
    let resource = self
      .routes
      .get(route)
      .ok_or_else(|| tera::Error::msg(format!("url: no route named '{route}'")))?;
    let pattern = resource.pattern().unwrap_or_default();

    let mut unknown: Vec<_> = parts
      .keys()
      .filter(|name| !pattern.contains(&format!("{{{name}}}")) && !pattern.contains(&format!("{{{name}:")))
      .collect();
    if !unknown.is_empty() {
      unknown.sort();
      return Err(tera::Error::msg(format!(
        "url: route '{route}' has no parameter(s) {unknown:?}"
      )));
    }

    let mut url = String::with_capacity(pattern.len());
    if !resource.resource_path_from_map(&mut url, parts) {
      return Err(tera::Error::msg(format!(
        "url: missing parameter for route '{route}' with pattern '{pattern}'"
      )));
    }
    Ok(url)
  }
}

fn query_string(query: &Value) -> tera::Result<String> {
  match query {
    Value::String(s) => Ok(s.trim_start_matches('?').to_string()),
    Value::Object(map) => {
      let pairs: Vec<(&str, String)> = map
        .iter()
        .map(|(key, value)| {
          let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
          };
          (key.as_str(), value)
        })
        .collect();
      serde_urlencoded::to_string(pairs).map_err(|e| tera::Error::msg(format!("url: invalid {QUERY_ARG}: {e}")))
    }
    other => Err(tera::Error::msg(format!(
      "url: {QUERY_ARG} should be a string or a mapping, got {}",
      value_kind(other)
    ))),
  }
}

impl tera::Function for UrlFor {
  fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let route = match args.get(ROUTE_ARG) {
      Some(Value::String(route)) => route,
      Some(other) => {
        return Err(tera::Error::msg(format!(
          "url: '{ROUTE_ARG}' should be a string, got {}",
          value_kind(other)
        )));
      }
      None => return Err(tera::Error::msg(format!("url: missing '{ROUTE_ARG}' argument"))),
    };

    let mut query = None;
    let mut parts = HashMap::new();
    for (key, value) in args {
      match key.as_str() {
        ROUTE_ARG => continue,
        QUERY_ARG => query = Some(query_string(value)?),
        _ => {
          // Path parameters are strings or integers, never bools or floats.
          let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) if !n.is_f64() => n.to_string(),
            other => {
              return Err(tera::Error::msg(format!(
                "argument value should be str or int, got {key} -> [{}] {other}",
                value_kind(other)
              )));
            }
          };
          parts.insert(key.as_str(), utf8_percent_encode(&value, PATH_PARAM_SET).to_string());
        }
      }
    }

    let mut url = self.reverse(route, &parts)?;
    if let Some(query) = query.filter(|q| !q.is_empty()) {
      url.push('?');
      url.push_str(&query);
    }
    Ok(Value::String(url))
  }
}

/// The `static` template function.
///
/// `{{ static(path="styles.css") }}` joins the configured static root URL and
/// the given path, e.g. `/static/styles.css` or `https://cdn.example.com/styles.css`.
pub(crate) struct StaticUrl {
  root: Option<String>,
}

impl StaticUrl {
  pub(crate) fn new(root: Option<String>) -> Self {
    Self { root }
  }
}

impl tera::Function for StaticUrl {
  fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let root = self.root.as_deref().ok_or_else(|| {
      tera::Error::msg(
        "app does not define a static root url, \
         set one with EnvironmentBuilder::static_root_url(\"<static root>\")",
      )
    })?;
    let path = match args.get("path") {
      Some(Value::String(path)) => path,
      _ => return Err(tera::Error::msg("static: missing string argument 'path'")),
    };
    Ok(Value::String(format!(
      "{}/{}",
      root.trim_end_matches('/'),
      path.trim_start_matches('/')
    )))
  }
}
