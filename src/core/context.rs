use crate::core::helpers::value_kind;
use crate::error::{Result, TemplateError};

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tera::Context;

/// Conversion into a render context.
///
/// Only mapping-shaped values convert. A JSON number, string, array or null
/// is rejected with [`TemplateError::InvalidContext`] instead of being coerced.
pub trait IntoContext {
  fn into_context(self) -> Result<Context>;
}

impl IntoContext for Context {
  fn into_context(self) -> Result<Context> {
    Ok(self)
  }
}

impl IntoContext for Value {
  fn into_context(self) -> Result<Context> {
    match self {
      Value::Object(map) => map.into_context(),
      other => Err(TemplateError::InvalidContext {
        found: value_kind(&other),
      }),
    }
  }
}

impl IntoContext for Map<String, Value> {
  fn into_context(self) -> Result<Context> {
    let mut context = Context::new();
    for (key, value) in self {
      context.insert(key, &value);
    }
    Ok(context)
  }
}

impl<V: Serialize> IntoContext for HashMap<String, V> {
  fn into_context(self) -> Result<Context> {
    Ok(Context::from_serialize(self)?)
  }
}

impl<V: Serialize> IntoContext for BTreeMap<String, V> {
  fn into_context(self) -> Result<Context> {
    Ok(Context::from_serialize(self)?)
  }
}

/// Values accumulated by context processors for the current request.
///
/// Created empty by the middleware when a request enters, filled in processor
/// order and dropped together with the request.
#[derive(Clone, Debug)]
pub struct RequestContext(Context);

impl Default for RequestContext {
  fn default() -> Self {
    Self(Context::new())
  }
}

impl RequestContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds the values of `partial`, replacing keys that are already present.
  pub fn extend(&mut self, partial: Context) {
    self.0.extend(partial);
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }
}

/// Overlays the handler's context on top of the request-scoped one.
///
/// Handler values win on key collisions. Neither input is modified: the
/// request-scoped context is cloned and the handler context is consumed, so a
/// caller that keeps its own copy never observes processor keys in it.
pub fn merge(request_scoped: Option<&RequestContext>, handler: Context) -> Context {
  match request_scoped {
    Some(scoped) => {
      let mut merged = scoped.0.clone();
      merged.extend(handler);
      merged
    }
    None => handler,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn context(value: Value) -> Context {
    value.into_context().unwrap()
  }

  #[test]
  fn object_values_become_contexts() {
    let ctx = context(json!({"head": "HEAD", "count": 3}));
    assert_eq!(ctx.get("head"), Some(&json!("HEAD")));
    assert_eq!(ctx.get("count"), Some(&json!(3)));
  }

  #[test]
  fn non_mapping_values_are_rejected() {
    let err = json!(123).into_context().unwrap_err();
    assert_eq!(err.to_string(), "context should be mapping, not integer");

    let err = json!(["a"]).into_context().unwrap_err();
    assert_eq!(err.to_string(), "context should be mapping, not sequence");

    let err = Value::Null.into_context().unwrap_err();
    assert!(matches!(err, TemplateError::InvalidContext { found: "null" }));
  }

  #[test]
  fn maps_of_serializable_values_convert() {
    let ctx = HashMap::from([("a".to_string(), 1)]).into_context().unwrap();
    assert_eq!(ctx.get("a"), Some(&json!(1)));

    let ctx = BTreeMap::from([("b".to_string(), vec!["x"])]).into_context().unwrap();
    assert_eq!(ctx.get("b"), Some(&json!(["x"])));
  }

  #[test]
  fn handler_values_win_over_request_scoped_values() {
    let mut scoped = RequestContext::new();
    scoped.extend(context(json!({"foo": 1, "bar": "should be overwritten"})));

    let merged = merge(Some(&scoped), context(json!({"bar": 2})));

    assert_eq!(merged.get("foo"), Some(&json!(1)));
    assert_eq!(merged.get("bar"), Some(&json!(2)));
    // The request-scoped context itself is left alone.
    assert_eq!(scoped.get("bar"), Some(&json!("should be overwritten")));
  }

  #[test]
  fn later_partials_overwrite_earlier_ones() {
    let mut scoped = RequestContext::new();
    scoped.extend(context(json!({"who": "first"})));
    scoped.extend(context(json!({"who": "second"})));
    assert_eq!(scoped.get("who"), Some(&json!("second")));
  }

  #[test]
  fn shared_handler_context_is_not_tainted() {
    let mut scoped = RequestContext::new();
    scoped.extend(context(json!({"injected": true})));
    let shared = context(json!({"page": "home"}));

    let first = merge(Some(&scoped), shared.clone());
    let second = merge(None, shared.clone());

    assert!(first.contains_key("injected"));
    assert!(!second.contains_key("injected"));
    assert!(!shared.contains_key("injected"));
  }
}
