use std::{future::IntoFuture, process, sync::Arc};

use bento::{
    application::{
        error::AppError, purge::PurgeService, registry::RegistryService, repos::ComponentsRepo,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        storage, telemetry,
    },
};
use tokio::{sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(AppError::from)?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Purge(args) => run_purge(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let services = build_services(repositories.clone(), &settings)?;

    let http_state = HttpState {
        registry: services.registry,
        db: repositories.clone(),
    };
    let admin_state = AdminState {
        purge: services.purge,
        db: repositories,
    };

    serve_http(&settings, http_state, admin_state).await
}

async fn run_purge(settings: config::Settings, args: config::PurgeArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let services = build_services(repositories, &settings)?;

    info!(
        target = "bento::purge",
        identifier = %args.identifier,
        "Starting purge"
    );

    let result = services.purge.purge(&args.identifier).await?;

    if result.failed_deletes.is_empty() {
        info!(
            target = "bento::purge",
            component_id = result.component_id,
            "Purge completed"
        );
    } else {
        warn!(
            target = "bento::purge",
            component_id = result.component_id,
            failed_deletes = ?result.failed_deletes,
            "Purge completed with blobs left behind"
        );
    }

    Ok(())
}

struct Services {
    purge: Arc<PurgeService>,
    registry: Arc<RegistryService>,
}

fn build_services(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<Services, AppError> {
    let components_repo: Arc<dyn ComponentsRepo> = repositories;

    let purge_blobs = storage::open_bucket(&settings.storage, &settings.storage.purge_bucket)?;
    let registry_blobs =
        storage::open_bucket(&settings.storage, &settings.storage.registry_bucket)?;

    Ok(Services {
        purge: Arc::new(PurgeService::new(components_repo.clone(), purge_blobs)),
        registry: Arc::new(RegistryService::new(components_repo, registry_blobs)),
    })
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "bento::http",
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "Listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
        .into_future();
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .into_future();

    let servers = async move { try_join!(public_server, admin_server).map(|_| ()) };
    tokio::pin!(servers);

    let result = tokio::select! {
        result = &mut servers => result,
        _ = tokio::signal::ctrl_c() => {
            info!(target = "bento::http", "Shutdown requested, draining connections");
            let _ = shutdown_tx.send(true);
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut servers).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        target = "bento::http",
                        timeout_secs = settings.server.graceful_shutdown.as_secs(),
                        "Graceful shutdown timed out"
                    );
                    Ok(())
                }
            }
        }
    };

    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
