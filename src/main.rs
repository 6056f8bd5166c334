use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use brokerage_engine::{
    admin_handlers,
    auth::JwtAuth,
    config::Config,
    database::Database,
    gateway::AdminGateway,
    handlers, metrics,
    services::TransactionService,
    store::LedgerStore,
};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    metrics::register_metrics();

    info!("Starting brokerage engine on port {}", config.server.port);

    let db = Arc::new(
        Database::new(&config.database.url, config.database.max_connections)
            .await
            .expect("Failed to connect to database"),
    );

    let store: Arc<dyn LedgerStore> = db.clone();
    let engine = Arc::new(TransactionService::new(store));
    let gateway = Arc::new(AdminGateway::new(engine.clone()));

    let auth_config = config.auth.clone();
    let jwt_secret = config.auth.jwt_secret.clone();

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .wrap(JwtAuth::new(jwt_secret.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(engine.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(auth_config.clone()))
            .configure(handlers::configure_routes)
            .configure(admin_handlers::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
