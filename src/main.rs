use std::{process, sync::Arc};

use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        accounts::AccountService,
        admin::{AdminContentService, AdminGroupError, AdminGroupService, CreateGroupCommand},
        error::AppError,
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{GroupsRepo, Repositories},
    },
    config,
    domain::error::DomainError,
    infra::{
        cache::ResponseCache,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
        uploads::ImageStorage,
    },
};

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
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::CreateGroup(args) => run_create_group(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let (http_state, admin_state) =
        build_states(Repositories::from_shared(repositories), &settings)?;
    serve_http(&settings, http_state, admin_state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "yatube::migrate", "migrations applied");
    Ok(())
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let groups_repo: Arc<dyn GroupsRepo> = repositories;
    let service = AdminGroupService::new(groups_repo);

    let group = service
        .create(CreateGroupCommand {
            title: args.title,
            slug: args.slug.unwrap_or_default(),
            description: args.description,
        })
        .await
        .map_err(|err| match err {
            AdminGroupError::Validation(errors) => AppError::from(DomainError::from(errors)),
            AdminGroupError::Repo(err) => AppError::Repo(err),
        })?;

    info!(
        target = "yatube::create_group",
        slug = %group.slug,
        "group `{}` created",
        group.title
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

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_states(
    repos: Repositories,
    settings: &config::Settings,
) -> Result<(HttpState, AdminState), AppError> {
    let Repositories {
        users: users_repo,
        sessions: sessions_repo,
        groups: groups_repo,
        posts: posts_repo,
        posts_write: posts_write_repo,
        comments: comments_repo,
        follows: follows_repo,
        records: records_repo,
    } = repos;

    let images = Arc::new(
        ImageStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    let page_size = settings.feed.page_size.get();
    let index_cache = ResponseCache::new(settings.cache.capacity, settings.feed.index_cache);

    let http_state = HttpState {
        feed: Arc::new(FeedService::new(
            posts_repo.clone(),
            groups_repo.clone(),
            users_repo.clone(),
            follows_repo.clone(),
            page_size,
        )),
        posts: Arc::new(PostService::new(
            posts_repo.clone(),
            posts_write_repo,
            groups_repo.clone(),
            comments_repo,
            images.clone(),
        )),
        follows: Arc::new(FollowService::new(users_repo.clone(), follows_repo)),
        accounts: Arc::new(AccountService::new(
            users_repo.clone(),
            sessions_repo,
            settings.sessions.ttl,
        )),
        images,
        index_cache: index_cache.clone(),
        session_cookie: Arc::from(settings.sessions.cookie_name.as_str()),
        session_ttl: settings.sessions.ttl,
        upload_limit_bytes: settings.uploads.max_request_bytes.get() as usize,
        display_length: settings.feed.display_length,
    };

    let admin_state = AdminState {
        groups: Arc::new(AdminGroupService::new(groups_repo.clone())),
        content: Arc::new(AdminContentService::new(
            posts_repo,
            groups_repo,
            users_repo,
            records_repo,
            page_size,
            settings.feed.empty_value_display.clone(),
        )),
        index_cache,
        display_length: settings.feed.display_length,
    };

    Ok((http_state, admin_state))
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
        target = "yatube::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
