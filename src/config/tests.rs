use super::*;

#[test]
fn defaults_match_site_constants() {
    let settings = Settings::from_defaults().expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
    assert_eq!(settings.server.admin_addr.port(), DEFAULT_ADMIN_PORT);
    assert_eq!(settings.feed.page_size.get(), 10);
    assert_eq!(settings.feed.index_cache, Duration::from_secs(20));
    assert_eq!(settings.feed.display_length, 15);
    assert_eq!(settings.feed.empty_value_display, "-пусто-");
    assert_eq!(settings.cache.capacity.get(), 64);
    assert_eq!(settings.sessions.cookie_name, "sessionid");
    assert_eq!(settings.sessions.ttl, time::Duration::days(14));
    assert!(settings.database.url.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.feed.page_size = Some(20);

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        feed_page_size: Some(5),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.feed.page_size.get(), 5);
}

#[test]
fn uploads_limit_defaults_to_5_mib() {
    let settings = Settings::from_defaults().expect("valid settings");
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert_eq!(settings.uploads.directory, PathBuf::from("media"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_values_name_the_offending_key() {
    let mut raw = RawSettings::default();
    raw.feed.index_cache_seconds = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "feed.index_cache_seconds"),
        other => panic!("unexpected result: {other:?}"),
    }

    let mut raw = RawSettings::default();
    raw.feed.page_size = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "feed.page_size"),
        other => panic!("unexpected result: {other:?}"),
    }

    let mut raw = RawSettings::default();
    raw.cache.capacity = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "cache.capacity"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn listeners_must_not_collide() {
    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(DEFAULT_PUBLIC_PORT);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "server.admin_port",
            ..
        })
    ));
}

#[test]
fn cookie_name_is_validated() {
    let mut raw = RawSettings::default();
    raw.sessions.cookie_name = Some("bad name;".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["yatube"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from(["yatube", "migrate", "--database-url", "postgres://example"]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => assert_eq!(
            migrate.database.database_url.as_deref(),
            Some("postgres://example")
        ),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_create_group_arguments() {
    let args = CliArgs::parse_from([
        "yatube",
        "create-group",
        "--title",
        "Лев Толстой",
        "--description",
        "Группа любителей классики",
    ]);

    match args.command.expect("create-group command") {
        Command::CreateGroup(group) => {
            assert_eq!(group.title, "Лев Толстой");
            assert!(group.slug.is_none());
            assert_eq!(group.description, "Группа любителей классики");
            assert!(group.database.database_url.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "yatube",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--feed-index-cache-seconds",
        "60",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.feed_index_cache_seconds, Some(60));
        }
        _ => panic!("wrong command parsed"),
    }
}
