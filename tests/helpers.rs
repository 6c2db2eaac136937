mod common;

use crate::common::{body_string, registry};

use actix_tera::{Environment, template};
use actix_web::{App, HttpRequest, http::StatusCode, test, web};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;

async fn script_text(_req: HttpRequest) -> Value {
  json!({"text": "<script>alert(1)</script>"})
}

#[actix_rt::test]
async fn test_autoescape_on_by_default() {
  let registry = registry(Environment::builder().raw_template("tmpl.html", "<html>{{ text }}</html>"));
  let app = test::init_service(
    App::new()
      .configure(|cfg| registry.configure(cfg))
      .route("/", web::get().to(template("tmpl.html").handler(script_text))),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

  assert_eq!(
    body_string(resp).await,
    "<html>&lt;script&gt;alert(1)&lt;/script&gt;</html>"
  );
}

#[actix_rt::test]
async fn test_autoescape_off() {
  let registry = registry(
    Environment::builder()
      .raw_template("tmpl.html", "<html>{{ text }}</html>")
      .autoescape(false),
  );
  let app = test::init_service(
    App::new()
      .configure(|cfg| registry.configure(cfg))
      .route("/", web::get().to(template("tmpl.html").handler(script_text))),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

  assert_eq!(body_string(resp).await, "<html><script>alert(1)</script></html>");
}

#[actix_rt::test]
async fn test_custom_filters() {
  fn add_2(value: &tera::Value, _: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    let n = tera::from_value::<i64>(value.clone())?;
    Ok(tera::Value::from(n + 2))
  }

  fn add_3(value: &tera::Value, _: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    let n = tera::from_value::<i64>(value.clone())?;
    Ok(tera::Value::from(n + 3))
  }

  let registry = registry(
    Environment::builder()
      .raw_template("tmpl.html", "<html><body><h1>{{ 5 | add_2 }}</h1>{{ 5 | add_3 }}</body></html>")
      .filter("add_2", add_2)
      .filter("add_3", add_3),
  );
  let app = test::init_service(
    App::new()
      .configure(|cfg| registry.configure(cfg))
      .route("/", web::get().to(template("tmpl.html").handler(|| async {}))),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

  assert_eq!(body_string(resp).await, "<html><body><h1>7</h1>8</body></html>");
}

#[actix_rt::test]
async fn test_url_helper() {
  let registry = registry(
    Environment::builder()
      .raw_template(
        "tmpl.html",
        "{{ url(route='user', name='John Doe') }} {{ url(route='item', id=42, query_=query) }} {{ url(route='index') }}",
      )
      .route("user", "/user/{name}")
      .route("item", "/items/{id:\\d+}")
      .route("index", "/"),
  );
  let app = test::init_service(
    App::new().configure(|cfg| registry.configure(cfg)).route(
      "/",
      web::get().to(template("tmpl.html").handler(|| async { json!({"query": {"page": 2}}) })),
    ),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

  assert_eq!(body_string(resp).await, "/user/John%20Doe /items/42?page=2 /");
}

#[actix_rt::test]
async fn test_url_helper_rejects_unknown_parameters() {
  let registry = registry(
    Environment::builder()
      .raw_template("tmpl.html", "{{ url(route='index', page=1) }}")
      .route("index", "/"),
  );
  let app = test::init_service(
    App::new()
      .configure(|cfg| registry.configure(cfg))
      .route("/", web::get().to(template("tmpl.html").handler(|| async {}))),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_rt::test]
async fn test_static_helper() {
  let registry = registry(
    Environment::builder()
      .raw_template("tmpl.html", "<link href=\"{{ static(path='css/site.css') }}\">")
      .static_root_url("/static"),
  );
  let app = test::init_service(
    App::new()
      .configure(|cfg| registry.configure(cfg))
      .route("/", web::get().to(template("tmpl.html").handler(|| async {}))),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

  assert_eq!(body_string(resp).await, "<link href=\"/static/css/site.css\">");
}

#[actix_rt::test]
async fn test_static_helper_without_root_url() {
  let registry = registry(Environment::builder().raw_template("tmpl.html", "{{ static(path='site.css') }}"));
  let app = test::init_service(
    App::new()
      .configure(|cfg| registry.configure(cfg))
      .route("/", web::get().to(template("tmpl.html").handler(|| async {}))),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_rt::test]
async fn test_reload_is_seen_by_decorated_handlers() {
  // 1. Setup: a template file on disk
  let temp_dir = tempdir().unwrap();
  let template_path = temp_dir.path().join("index.html");
  fs::write(&template_path, "<html>{{ text }}</html>").unwrap();
  let glob_path = temp_dir.path().join("*.html").to_str().unwrap().to_string();

  let registry = registry(Environment::builder().templates_glob(&glob_path).autoescape(false));
  let env = registry.get(actix_tera::DEFAULT_KEY).unwrap().clone();
  let app = test::init_service(
    App::new()
      .configure(|cfg| registry.configure(cfg))
      .route("/", web::get().to(template("index.html").handler(script_text))),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
  assert_eq!(body_string(resp).await, "<html><script>alert(1)</script></html>");

  // 2. Change the file and reload the shared environment
  fs::write(&template_path, "<body>{{ text }}</body>").unwrap();
  env.full_reload().unwrap();

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
  assert_eq!(body_string(resp).await, "<body><script>alert(1)</script></body>");
}
