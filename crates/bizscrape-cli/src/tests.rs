use super::*;

#[test]
fn parses_scrape_with_repeated_urls() {
    let cli = Cli::try_parse_from([
        "bizscrape-cli",
        "scrape",
        "--url",
        "https://example.com/a",
        "--url",
        "https://example.com/b",
        "--max-concurrency",
        "2",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Some(Commands::Scrape {
            urls,
            max_concurrency,
            pretty,
        }) => {
            assert_eq!(urls, ["https://example.com/a", "https://example.com/b"]);
            assert_eq!(max_concurrency, Some(2));
            assert!(!pretty);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn scrape_requires_at_least_one_url() {
    assert!(Cli::try_parse_from(["bizscrape-cli", "scrape"]).is_err());
}

#[test]
fn parses_ingest_dry_run() {
    let cli =
        Cli::try_parse_from(["bizscrape-cli", "ingest", "--dry-run"]).expect("valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Ingest { dry_run: true })
    ));
}

#[test]
fn runs_limit_defaults_to_twenty() {
    let cli = Cli::try_parse_from(["bizscrape-cli", "runs"]).expect("valid cli args");
    assert!(matches!(cli.command, Some(Commands::Runs { limit: 20 })));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["bizscrape-cli", "db", "migrate"]).expect("valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["bizscrape-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}
