//! Example consumer: a separate Rust project that serves resources declared with resourceful.
//!
//! Run from this directory: `cargo run`
//! Or from the repo root: `CONFIG_PATH=example_consumer/config cargo run -p example-consumer`
//!
//! With `DATABASE_URL` set (or a `database.json` entry for `APP_ENV`) the models are
//! served from PostgreSQL; otherwise from an in-memory store.

use resourceful::{
    common_routes, init_tracing, resolve, resource_routes, Action, ActionOptions, Application,
    ConfigError, DeclareActions, MemoryStore, ModelHandle, PgStore, Registry, Settings,
};
use serde_json::json;
use tokio::net::TcpListener;

enum Store {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl Store {
    fn model(&self, name: &str) -> Result<ModelHandle, ConfigError> {
        match self {
            Store::Memory(store) => store.model(name),
            Store::Postgres(store) => store.model(name),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();
    init_tracing("resourceful=info,example_consumer=info");

    let models = resolve(&settings.store_config().await?)?;
    let store = match settings.database().await? {
        Some(database) => Store::Postgres(PgStore::connect(&database, models).await?),
        None => {
            tracing::warn!("no database configured, serving from memory");
            Store::Memory(MemoryStore::new(models))
        }
    };

    let users = store.model("users")?;
    let books = store.model("books")?;
    let registry = Registry::builder()
        .resource("users", |r| {
            r.model(users)
                .attribute("id")
                .attribute("name")
                .computed("contact", |user| {
                    json!(format!(
                        "{} <{}>",
                        user.get_str("name").unwrap_or_default(),
                        user.get_str("email").unwrap_or_default()
                    ))
                })
                .has_many("books")
                .action_with(Action::Create, ActionOptions::new().permit(["name", "email"]))
                .action(Action::Show)
                .action(Action::Update)
                .action(Action::Destroy)
                .collection("all", |c| {
                    c.show(|mut ctx| async move {
                        let users = ctx.model().all().await?;
                        ctx.set_records(users);
                        Ok(ctx)
                    })
                })
        })
        .resource("books", |r| {
            r.model(books)
                .attribute("id")
                .attribute("isbn")
                .action(Action::Create)
                .action(Action::Show)
                .member("owner", |m| {
                    m.show(|mut ctx| async move {
                        ctx.has_one("user");
                        Ok(ctx)
                    })
                })
        })
        .build()?;

    let app = common_routes().merge(resource_routes(Application::new(registry), settings.body_limit));
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
