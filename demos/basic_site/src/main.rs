use actix_files::Files;
use actix_tera::{
  ContextProcessors, DEFAULT_KEY, Environment, HandlerResult, RunContextProcessors, TemplateRegistry, View,
  async_trait, request_processor, template,
};
use actix_web::{App, Error, HttpRequest, HttpResponse, HttpServer, http::header, web};
use serde_json::{Value, json};
use std::collections::HashMap;
use tera::Context;

#[derive(serde::Serialize)]
struct User {
  name: String,
  email: String,
}

/// Renders the home page.
async fn index(_req: HttpRequest) -> Value {
  json!({
    "page_title": "Home",
    "message": "Welcome to the actix-tera demo site!",
  })
}

/// Renders a page with more complex context.
async fn user_profile(name: web::Path<String>) -> Context {
  let name = name.into_inner();
  let mut context = Context::new();
  context.insert("page_title", "User Profile");
  context.insert(
    "user",
    &User {
      email: format!("{name}@example.com"),
      name,
    },
  );
  context
}

/// A class-based view: `GET` lists notes, `POST` redirects back.
struct Notes {
  request: HttpRequest,
}

#[async_trait(?Send)]
impl View for Notes {
  fn new(request: HttpRequest) -> Self {
    Self { request }
  }

  fn request(&self) -> &HttpRequest {
    &self.request
  }

  async fn get(&self) -> Result<HandlerResult, Error> {
    let context = json!({
      "page_title": "Notes",
      "notes": ["templates are looked up per request", "handlers only return data"],
    });
    Ok(HandlerResult::try_from(context)?)
  }

  async fn post(&self) -> Result<HandlerResult, Error> {
    log::info!("Pretending to store a note from {:?}", self.request.peer_addr());
    Ok(
      HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/notes"))
        .finish()
        .into(),
    )
  }
}

fn shout(value: &tera::Value, _: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
  let text = tera::from_value::<String>(value.clone())?;
  Ok(tera::Value::from(text.to_uppercase()))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // Initialize logging
  env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

  let manifest_dir = env!("CARGO_MANIFEST_DIR");
  let templates_glob = format!("{manifest_dir}/templates/**/*.html");
  let static_dir = format!("{manifest_dir}/static");

  // 1. Configure the template environment and the context processors.
  let mut registry = TemplateRegistry::new();
  registry
    .setup_with_processors(
      DEFAULT_KEY,
      Environment::builder()
        .templates_glob(&templates_glob)
        .add_global("site_name", "actix-tera Demo")
        .add_global("version", env!("CARGO_PKG_VERSION"))
        .filter("shout", shout)
        .static_root_url("/static")
        .route("index", "/")
        .route("profile", "/profile/{name}")
        .route("notes", "/notes"),
      ContextProcessors::new().with(request_processor),
    )
    .expect("Failed to build the template environment");

  log::info!("🚀 Starting server at http://127.0.0.1:3000");

  HttpServer::new(move || {
    App::new()
      // 2. Install the registry and run the processors for every request.
      .configure(|cfg| registry.configure(cfg))
      .wrap(RunContextProcessors::default())
      .service(Files::new("/static", static_dir.clone()))
      // 3. Handlers return data, the decorator renders it.
      .route("/", web::get().to(template("index.html").handler(index)))
      .route("/profile/{name}", web::get().to(template("user.html").handler(user_profile)))
      .route("/notes", web::route().to(template("notes.html").view::<Notes>()))
  })
  .bind(("127.0.0.1", 3000))?
  .run()
  .await
}
