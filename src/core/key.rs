use std::fmt;

/// Identifies one template environment inside an application.
///
/// Most applications only ever use [`DEFAULT_KEY`]. Register additional keys
/// when a single app needs several independently configured environments,
/// e.g. one for pages and one for emails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AppKey(&'static str);

/// The key used when none is given explicitly.
pub const DEFAULT_KEY: AppKey = AppKey::new("tera_environment");

impl AppKey {
  pub const fn new(name: &'static str) -> Self {
    Self(name)
  }

  pub fn as_str(&self) -> &'static str {
    self.0
  }
}

impl Default for AppKey {
  fn default() -> Self {
    DEFAULT_KEY
  }
}

impl fmt::Display for AppKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0)
  }
}
