use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use plantcare_backend::classifier::{ClassCatalog, TorchClassifier};
use plantcare_backend::config::AppConfig;
use plantcare_backend::diagnosis::{Orchestrator, SessionStore};
use plantcare_backend::enhance::{DisabledEnhancer, Enhancer, RealEsrganEnhancer};
use plantcare_backend::guide::ReferenceLibrary;
use plantcare_backend::routes::{UploadLimits, configure_routes};
use std::env;
use std::io;
use std::sync::Arc;

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, e);
    io::Error::other(format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;
    config
        .validate()
        .map_err(|e| startup_error("Invalid configuration", e))?;

    let catalog = match &config.classifier.labels_path {
        Some(path) => ClassCatalog::from_file(path)
            .map_err(|e| startup_error("Failed to load class labels", e))?,
        None => ClassCatalog::default(),
    };
    log::info!("Class catalog has {} labels", catalog.len());

    let classifier = TorchClassifier::new(&config.classifier, catalog.clone())
        .map_err(|e| startup_error("Failed to set up classifier", e))?;
    if config.classifier.preload {
        classifier
            .warm_up()
            .map_err(|e| startup_error("Failed to preload model at startup", e))?;
    }

    let enhancer: Arc<dyn Enhancer> = if config.enhancer.enabled {
        let missing = config.enhancer.missing_artifacts();
        if !missing.is_empty() {
            log::warn!(
                "Real-ESRGAN artifacts missing, enhancement requests will fall back to the original image: {:?}",
                missing
            );
        }
        Arc::new(RealEsrganEnhancer::new(config.enhancer.clone()))
    } else {
        log::info!("Image enhancement disabled");
        Arc::new(DisabledEnhancer)
    };

    let orchestrator = Orchestrator::new(Arc::new(classifier), enhancer, config.enhancer.timeout());
    let store = web::Data::new(SessionStore::new(config.server.max_sessions));
    let references = ReferenceLibrary::new(config.reference.clone());
    let limits = UploadLimits {
        max_bytes: config.server.max_upload_bytes,
    };
    let frontend_dir = config.server.frontend_dir.clone();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(orchestrator.clone()))
            .app_data(store.clone())
            .app_data(web::Data::new(references.clone()))
            .app_data(web::Data::new(catalog.clone()))
            .app_data(web::Data::new(limits))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
