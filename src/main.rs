mod aggregate;
mod bitbucket;
mod client;
mod config;
mod diffstat;
mod error;
mod hooks;
mod http;
mod push;
mod resolver;
#[cfg(test)]
mod testing;

use actix_web::{middleware::Logger, web, App, HttpServer};
use color_eyre::eyre;

#[actix_web::main]
async fn main() -> eyre::Result<()> {
    dotenv::dotenv().ok();
    color_eyre::install()?;
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish())?;

    let config: config::Config = envy::prefixed("HOOKSTAT_").from_env()?;
    let bind = config.bind.clone();
    tracing::info!(
        repo.owner = config.repo_owner.as_str(),
        repo.name = config.repo_name.as_str(),
        "Listening for push webhooks on {}",
        bind,
    );

    let config = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .wrap(Logger::default())
            .route("/", web::post().to(hooks::push_hook))
    })
    .bind(bind)?
    .run()
    .await
    .map_err(Into::into)
}
