mod api;
mod dao;
mod model;
mod service;

use std::fs::{File, OpenOptions};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::api::endpoints::configure;
use crate::api::middleware::timing_middleware;
use crate::api::state::AppState;
use crate::dao::ShipRepository;
use crate::dao::memory::InMemoryShipDao;
use crate::dao::ships::ShipDao;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{ApplicationArguments, Config, DatabaseType, HttpsConfig, LoggingConfig};
use crate::service::ships::ShipService;

use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use clap::Parser;
use prometheus::IntGauge;
use rustls::pki_types::PrivateKeyDer;
use rustls::{ServerConfig, SupportedProtocolVersion};
use rustls_pemfile::{certs, pkcs8_private_keys};
use sqlx::{Pool, Postgres, pool};
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/**
 * Main entry point for the application.
 */
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = ApplicationArguments::parse();

    let config = get_config(&args.config_file)?;

    init_tracing(&config.logging)?;

    let prometheus = PrometheusMetricsBuilder::new("")
        .endpoint("/metrics")
        .mask_unmatched_patterns("UNKNOWN")
        .build()
        .map_err(|err| std::io::Error::other(format!("Failed to create Prometheus metrics: {err}")))?;

    match config.clone().database.db_type {
        DatabaseType::Postgresql { connection_string, max_connections, min_connections, acquire_timeout, acquire_slow_threshold, idle_timeout, max_lifetime } => {
            let connection_pool: Pool<Postgres> = pool::PoolOptions::new()
                .max_connections(max_connections)
                .min_connections(min_connections)
                .acquire_timeout(Duration::from_millis(acquire_timeout))
                .acquire_slow_threshold(Duration::from_millis(acquire_slow_threshold))
                .idle_timeout(Duration::from_millis(idle_timeout))
                .max_lifetime(Duration::from_millis(max_lifetime))
                .connect(connection_string.as_str())
                .await
                .map_err(|err| std::io::Error::other(format!("Failed to create database pool: {err}")))?;
            sqlx::migrate!("./sqlx-postgresql-migration/migrations")
                .run(&connection_pool)
                .await
                .map_err(|err| std::io::Error::other(format!("Failed to migrate database: {err}")))?;
            let connection_pool = Arc::new(connection_pool);
            register_db_metrics(&prometheus, connection_pool.clone())?;
            info!("Using PostgreSQL ship repository");
            run_server(&config, ShipDao::new(connection_pool), prometheus).await
        }
        DatabaseType::InMemory => {
            info!("Using in-memory ship repository");
            run_server(&config, InMemoryShipDao::new(), prometheus).await
        }
    }
}

/**
 * Binds the configured listeners and serves the ship endpoints until shutdown.
 *
 * #Arguments
 * `config`: The application configuration.
 * `ship_repository`: Storage backing the ship service.
 * `prometheus`: Prometheus middleware, also serving `/metrics`.
 */
async fn run_server<R: ShipRepository + Send + Sync + 'static>(config: &Config, ship_repository: R, prometheus: PrometheusMetrics) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(ShipService::new(ship_repository)));

    let server_init = HttpServer::new(move || {
        App::new()
            .wrap(from_fn(timing_middleware))
            .wrap(prometheus.clone())
            .app_data(state.clone())
            .configure(configure::<R>)
    });

    let server_init = if let Some(http_port) = &config.server.http_port { server_init.bind(("127.0.0.1", *http_port))? } else { server_init };
    let server_init = if let Some(https_config) = &config.server.https_config {
        let ssl_builder = ssl_builder(https_config).map_err(|err| std::io::Error::other(format!("Failed to create SSL/TLS configuration: {err}")))?;
        server_init.bind_rustls_0_23("127.0.0.1:".to_string() + &https_config.port.to_string(), ssl_builder).map_err(|err| std::io::Error::other(format!("Failed to bind HTTPS server: {err}")))?
    } else {
        server_init
    };

    server_init.workers(config.server.workers).run().await
}

/**
 * Initializes logging for the application.
 * Logs are written to the configured logfile, or to stdout when no logfile is set.
 *
 * #Arguments
 * `logging`: The logging configuration.
 *
 * #Returns
 * A `Result` indicating success or failure.
 */
fn init_tracing(logging: &LoggingConfig) -> Result<(), std::io::Error> {
    let mut env_filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    for directive in &logging.directives {
        env_filter = env_filter.add_directive(directive.parse().map_err(|err| std::io::Error::other(format!("Invalid logging directive {directive}: {err}")))?);
    }

    let file_layer = match &logging.logfile {
        Some(logfile) => {
            let file: File = OpenOptions::new().create(true).append(true).open(logfile).map_err(|err| std::io::Error::other(format!("Failed to open log file {logfile}: {err}")))?;
            Some(fmt_layer(logging, Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };
    let stdout_layer = if logging.logfile.is_none() { Some(fmt_layer(logging, std::io::stdout)) } else { None };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| std::io::Error::other(format!("Failed to initialize logging: {err}")))?;
    Ok(())
}

fn fmt_layer<S, W>(logging: &LoggingConfig, writer: W) -> fmt::Layer<S, DefaultFields, Format, W>
where
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fmt::layer()
        .with_target(logging.target)
        .with_thread_ids(logging.thread_ids)
        .with_thread_names(logging.thread_names)
        .with_line_number(logging.line_number)
        .with_level(logging.level)
        .with_ansi(logging.ansi)
        .with_file(logging.file)
        .with_writer(writer)
}

/**
 * Registers connection pool gauges and keeps them updated.
 *
 * #Arguments
 * `prometheus`: The Prometheus metrics instance to register the gauges with.
 * `connection_pool`: The connection pool to gather metrics from.
 */
fn register_db_metrics(prometheus: &PrometheusMetrics, connection_pool: Arc<Pool<Postgres>>) -> Result<(), std::io::Error> {
    let max_connections_gauge = IntGauge::new("max_connections", "Connection pool maximum").map_err(|err| std::io::Error::other(format!("Failed to create max_connections gauge: {err}")))?;
    let min_connections_gauge = IntGauge::new("min_connections", "Connection pool minimum").map_err(|err| std::io::Error::other(format!("Failed to create min_connections gauge: {err}")))?;
    let active_connections_gauge = IntGauge::new("active_connections", "Connection pool active").map_err(|err| std::io::Error::other(format!("Failed to create active_connections gauge: {err}")))?;
    let idle_connections_gauge = IntGauge::new("idle_connections", "Connection pool idle").map_err(|err| std::io::Error::other(format!("Failed to create idle_connections gauge: {err}")))?;
    register_prometheus_metrics(prometheus, &max_connections_gauge)?;
    register_prometheus_metrics(prometheus, &min_connections_gauge)?;
    register_prometheus_metrics(prometheus, &active_connections_gauge)?;
    register_prometheus_metrics(prometheus, &idle_connections_gauge)?;

    thread::spawn(move || {
        loop {
            max_connections_gauge.set(i64::from(connection_pool.options().get_max_connections()));
            min_connections_gauge.set(i64::from(connection_pool.options().get_min_connections()));
            active_connections_gauge.set(i64::from(connection_pool.size()));
            #[allow(clippy::cast_possible_wrap)]
            idle_connections_gauge.set(connection_pool.num_idle() as i64);
            thread::sleep(Duration::from_secs(1));
        }
    });
    Ok(())
}

/**
 * Registers a custom Prometheus gauge.
 */
fn register_prometheus_metrics(prometheus_metrics: &PrometheusMetrics, gauge: &IntGauge) -> Result<(), std::io::Error> {
    prometheus_metrics.registry.register(Box::new(gauge.clone())).map_err(|err| std::io::Error::other(format!("Failed to register Prometheus gauge: {err}")))?;
    Ok(())
}

/**
 * Initializes the SSL/TLS configuration for the server.
 *
 * #Arguments
 * `https_config`: The HTTPS configuration containing the certificate and private key files.
 *
 * #Returns
 * A `Result` containing the initialized `ServerConfig` or an `ApplicationError` if initialization fails.
 */
fn ssl_builder(https_config: &HttpsConfig) -> Result<ServerConfig, ApplicationError> {
    let config_builder = ServerConfig::builder_with_protocol_versions(&get_protocol_versions());
    let cert_file = &mut std::io::BufReader::new(
        File::open(&https_config.certificate_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read certificate file: {err}")))?,
    );
    let key_file = &mut std::io::BufReader::new(
        File::open(&https_config.private_key_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read private key file: {err}")))?,
    );
    let cert_chain = certs(cert_file).collect::<Result<Vec<_>, _>>().map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to convert certificate to der: {err}")))?;
    let private_key = pkcs8_private_keys(key_file)
        .map(|key| key.map(PrivateKeyDer::Pkcs8))
        .next()
        .ok_or_else(|| ApplicationError::new(ErrorType::Initialization, "No private key found in private key file".to_string()))?
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to convert private key to der: {err}")))?;
    let config = config_builder
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create server config: {err}")))?;
    Ok(config)
}

/**
 * Returns the supported TLS protocol versions.
 */
fn get_protocol_versions() -> Vec<&'static SupportedProtocolVersion> {
    vec![&rustls::version::TLS13]
}

/**
 * Reads the configuration from the specified file.
 *
 * #Arguments
 * `config_file`: The path to the configuration file.
 *
 * #Returns
 * A `Result` containing the parsed `Config` or an `std::io::Error` if reading or parsing fails.
*/
fn get_config(config_file: &str) -> Result<Config, std::io::Error> {
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| std::io::Error::other(format!("Failed to read config file: {err}")))?;
    let config: Config = toml::from_str(&config_str).map_err(|err| std::io::Error::other(format!("Failed to parse config file: {err}")))?;
    Ok(config)
}
