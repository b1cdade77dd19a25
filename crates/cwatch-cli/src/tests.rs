use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["cwatch-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["cwatch-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_seed_command() {
    let cli = Cli::try_parse_from(["cwatch-cli", "seed"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Seed)));
}

#[test]
fn parses_entity_toggle_commands() {
    let cli = Cli::try_parse_from(["cwatch-cli", "entity", "disable", "nook-works"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Entity {
            command: EntityCommands::Disable { ref slug }
        }) if slug == "nook-works"
    ));

    let cli = Cli::try_parse_from(["cwatch-cli", "entity", "enable", "nook-works"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Entity {
            command: EntityCommands::Enable { .. }
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["cwatch-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn collect_defaults_to_all_entities_and_kinds() {
    let cli = Cli::try_parse_from(["cwatch-cli", "collect"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            entity: None,
            ref kind,
            dry_run: false
        }) if kind.is_empty()
    ));
}

#[test]
fn collect_with_entity_and_kinds() {
    let cli = Cli::try_parse_from([
        "cwatch-cli",
        "collect",
        "--entity",
        "desk-harbor",
        "--kind",
        "employer_reviews,webpage",
        "--dry-run",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Collect {
            entity,
            kind,
            dry_run,
        }) => {
            assert_eq!(entity.as_deref(), Some("desk-harbor"));
            assert_eq!(kind, vec![SourceKind::EmployerReviews, SourceKind::Webpage]);
            assert!(dry_run);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn collect_rejects_unknown_kind() {
    let result = Cli::try_parse_from(["cwatch-cli", "collect", "--kind", "telepathy"]);
    assert!(result.is_err());
}

#[test]
fn insights_json_flag() {
    let cli = Cli::try_parse_from(["cwatch-cli", "insights", "--json"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Insights { json: true })));

    let cli = Cli::try_parse_from(["cwatch-cli", "insights"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Insights { json: false })));
}

#[test]
fn signals_requires_entity() {
    assert!(Cli::try_parse_from(["cwatch-cli", "signals"]).is_err());
}

#[test]
fn signals_parses_category_and_limit() {
    let cli = Cli::try_parse_from([
        "cwatch-cli",
        "signals",
        "--entity",
        "nook-works",
        "--category",
        "hiring",
        "--limit",
        "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Signals {
            ref entity,
            category: Some(SignalCategory::Hiring),
            limit: 5
        }) if entity == "nook-works"
    ));
}

#[test]
fn signals_limit_defaults_to_twenty() {
    let cli = Cli::try_parse_from(["cwatch-cli", "signals", "--entity", "nook-works"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Signals {
            category: None,
            limit: 20,
            ..
        })
    ));
}

#[test]
fn runs_defaults_and_id() {
    let cli = Cli::try_parse_from(["cwatch-cli", "runs"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Runs {
            id: None,
            limit: 10
        })
    ));

    let cli = Cli::try_parse_from(["cwatch-cli", "runs", "--id", "42"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Runs { id: Some(42), .. })
    ));
}
