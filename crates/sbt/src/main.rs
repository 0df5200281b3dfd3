use std::sync::Arc;

use sbt_apis::HttpJsonSource;

use sbt_core::{
    config::Config,
    dispatch::Dispatcher,
    plugins::{build_registry, standard_plugins},
    ports::JsonSource,
    roster::Roster,
    store::Db,
};

#[tokio::main]
async fn main() -> Result<(), sbt_core::Error> {
    sbt_core::logging::init("sbt")?;

    let cfg = Arc::new(Config::load()?);
    let db = Db::open(&cfg.database_path, cfg.db_timeout)?;
    let roster = Arc::new(Roster::new());
    let http: Arc<dyn JsonSource> = Arc::new(HttpJsonSource::new(cfg.http_timeout)?);

    let plugins = standard_plugins(&cfg, &db, roster.clone(), http);
    let registry = Arc::new(build_registry(plugins)?);

    let dispatcher = Arc::new(
        Dispatcher::new(registry, roster)
            .with_default_reply(cfg.default_reply.clone())
            .with_handler_timeout(cfg.handler_timeout),
    );

    sbt_telegram::router::run_polling(cfg, dispatcher)
        .await
        .map_err(|e| sbt_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
