use actix_cors::Cors;
use actix_web::dev::{fn_service, ServiceRequest, ServiceResponse};
use actix_web::{web, App, HttpServer, middleware::{Logger, DefaultHeaders}, cookie::Key};
use papers_please_backend::{
    config::Config,
    helper::chat_helpers::ChatClient,
    middleware::session_middleware,
    routes,
    setup::db_setup,
    AppState,
};
use r2d2_sqlite::SqliteConnectionManager;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "papers_server", author, version, about = "Starts the Papers Please web server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn fatal(message: String) -> io::Error {
    log::error!("{}", message);
    io::Error::new(io::ErrorKind::Other, message)
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CONTENT_TYPE,
        ])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::from_env(&cli.env_file).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("FATAL: Failed to load configuration: {}", e))
    })?;

    // Initialize logger using the value from config
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    fs::create_dir_all(&config.database_path)
        .map_err(|e| fatal(format!("FATAL: Failed to create database directory: {}", e)))?;
    fs::create_dir_all(&config.media_path)
        .map_err(|e| fatal(format!("FATAL: Failed to create media directory: {}", e)))?;

    let pool = db_setup::build_pool(SqliteConnectionManager::file(config.db_file_path()), 16)
        .map_err(|e| fatal(format!("FATAL: Failed to create the SQLite connection pool: {}", e)))?;
    {
        let mut conn = pool.get()
            .map_err(|e| fatal(format!("FATAL: Failed to get a DB connection for schema setup: {}", e)))?;
        db_setup::setup_database(&mut conn)
            .map_err(|e| fatal(format!("FATAL: Failed to initialize the database schema: {}", e)))?;
    }
    log::info!("Database ready at '{}'.", config.db_file_path().display());

    let chat_client = match &config.chat {
        Some(chat_config) => {
            let client = ChatClient::new(chat_config)
                .map_err(|e| fatal(format!("FATAL: Failed to build the chat HTTP client: {}", e)))?;
            log::info!("Chat assistant enabled with model '{}'.", chat_config.model);
            Some(client)
        }
        None => {
            log::info!("Chat assistant disabled: CHAT_API_URL / CHAT_API_KEY not set.");
            None
        }
    };
    let app_state = web::Data::new(AppState { chat_client });

    let session_key_bytes = hex::decode(&config.session_secret_key)
        .map_err(|e| fatal(format!("FATAL: SESSION_SECRET_KEY is not a valid hex string: {}", e)))?;
    let session_key = Key::try_from(session_key_bytes.as_slice())
        .map_err(|e| fatal(format!("FATAL: The decoded SESSION_SECRET_KEY is unusable: {}", e)))?;

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    let pool_data = web::Data::new(pool);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        let static_dir = config_data.static_dir.clone();
        let serve_spa = Path::new(&static_dir).join("index.html").is_file();

        App::new()
            .wrap(session_middleware(session_key.clone(), config_data.use_secure_cookies))
            .wrap(build_cors(&config_data.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "same-origin"))
            )
            .app_data(config_data.clone())
            .app_data(pool_data.clone())
            .app_data(app_state.clone())
            .configure(routes::config_api)
            .service(actix_files::Files::new("/media", &config_data.media_path))
            .configure(move |cfg| {
                if serve_spa {
                    cfg.service(
                        actix_files::Files::new("/", &static_dir)
                            .index_file("index.html")
                            .default_handler(fn_service(|req: ServiceRequest| async move {
                                let (req, _) = req.into_parts();
                                let response = routes::spa_fallback(&req).await;
                                Ok::<_, actix_web::Error>(ServiceResponse::new(req, response))
                            })),
                    );
                }
            })
    })
    .bind(server_address)?
    .run()
    .await
}
