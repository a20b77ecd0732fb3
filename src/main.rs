use std::{process, sync::Arc, time::Duration};

use aula::{
    application::{
        admin::{courses::AdminCourseService, lessons::AdminLessonService},
        auth::{AuthConfig, AuthService},
        catalog::CourseCatalogService,
        error::AppError,
        lessons::LessonService,
        notes::NoteService,
        profile::ProfileService,
        render,
        repos::{CompletionsRepo, CoursesRepo, LessonsRepo, NotesRepo, UsersRepo},
    },
    cache::{CacheConfig, CacheHandle, CacheStore, InMemoryCacheStore, RedisCacheStore},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AppState},
        telemetry,
        uploads::VideoStorage,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateAdmin(args) => run_create_admin(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_application_state(repositories, &settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(target = "aula::serve", addr = %settings.server.addr, "Aula listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_create_admin(
    settings: config::Settings,
    args: config::CreateAdminArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let users: Arc<dyn UsersRepo> = repositories;

    // Token issuance is not involved here, so a throwaway cache and secret
    // are enough to drive the account-creation path.
    let cache = CacheHandle::new(Arc::new(InMemoryCacheStore::new()));
    let auth = AuthService::new(
        users,
        cache,
        AuthConfig {
            secret: settings.auth.secret.clone().unwrap_or_default(),
            token_ttl: token_ttl(&settings),
        },
    );

    let user = auth
        .create_admin(&args.email, &args.full_name, &args.password)
        .await
        .map_err(|err| {
            AppError::unexpected(format!("failed to create admin account: {}", err.status()))
        })?;

    info!(
        target = "aula::create_admin",
        email = %user.email,
        "administrator account created"
    );
    Ok(())
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

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_cache_handle(
    settings: &config::Settings,
    cache_config: &CacheConfig,
) -> Result<CacheHandle, AppError> {
    let store: Arc<dyn CacheStore> = match settings.cache.url.as_deref() {
        Some(url) => Arc::new(
            RedisCacheStore::new(url, cache_config.op_timeout)
                .map_err(|err| AppError::unexpected(format!("invalid cache url: {err}")))?,
        ),
        None => {
            info!(
                target = "aula::serve",
                "no cache host configured, using in-process store"
            );
            Arc::new(InMemoryCacheStore::new())
        }
    };

    Ok(CacheHandle::new(store))
}

fn token_ttl(settings: &config::Settings) -> Duration {
    Duration::from_secs(settings.auth.token_ttl_minutes.get() * 60)
}

fn build_application_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<AppState, AppError> {
    let users: Arc<dyn UsersRepo> = repositories.clone();
    let courses: Arc<dyn CoursesRepo> = repositories.clone();
    let lessons: Arc<dyn LessonsRepo> = repositories.clone();
    let completions: Arc<dyn CompletionsRepo> = repositories.clone();
    let notes: Arc<dyn NotesRepo> = repositories.clone();

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = build_cache_handle(settings, &cache_config)?;

    let storage = Arc::new(
        VideoStorage::new(settings.media.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    let secret = settings
        .auth
        .secret
        .clone()
        .ok_or_else(|| InfraError::configuration("auth secret is not configured"))
        .map_err(AppError::from)?;

    let auth_service = Arc::new(AuthService::new(
        users,
        cache.clone(),
        AuthConfig {
            secret,
            token_ttl: token_ttl(settings),
        },
    ));

    let catalog_service = Arc::new(CourseCatalogService::new(courses.clone(), lessons.clone()));
    let lesson_service = Arc::new(LessonService::new(
        lessons.clone(),
        completions.clone(),
        render::render_service(),
        cache.clone(),
        &cache_config,
    ));
    let note_service = Arc::new(NoteService::new(notes, lessons.clone()));
    let profile_service = Arc::new(ProfileService::new(lessons.clone(), completions.clone()));
    let admin_course_service = Arc::new(AdminCourseService::new(
        courses.clone(),
        lessons.clone(),
        storage.clone(),
        cache.clone(),
    ));
    let admin_lesson_service = Arc::new(AdminLessonService::new(
        courses,
        lessons,
        completions,
        storage.clone(),
        cache,
    ));

    Ok(AppState {
        auth: auth_service,
        catalog: catalog_service,
        lessons: lesson_service,
        notes: note_service,
        profile: profile_service,
        admin_courses: admin_course_service,
        admin_lessons: admin_lesson_service,
        storage,
        db: repositories,
        cookie_secure: settings.auth.cookie_secure,
        token_ttl_seconds: settings.auth.token_ttl_minutes.get() * 60,
        upload_limit_bytes: settings.media.max_request_bytes.get(),
    })
}
