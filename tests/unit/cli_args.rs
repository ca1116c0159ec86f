//! Command-line parsing

use budget_pacing_monitor::cli::{Cli, Commands};
use budget_pacing_monitor::config::PublisherKind;
use clap::Parser;

#[test]
fn test_run_without_overrides() {
    let cli = Cli::try_parse_from(["budget-pacing-monitor", "run"]).unwrap();
    match cli.command {
        Commands::Run(args) => {
            assert!(args.batch_size.is_none());
            assert!(args.publisher.is_none());
        }
        other => panic!("unexpected command {other:?}"),
    }
    assert!(cli.metrics_addr.is_none());
}

#[test]
fn test_publisher_values() {
    let cli = Cli::try_parse_from(["budget-pacing-monitor", "run", "--publisher", "google"]).unwrap();
    assert!(matches!(cli.command, Commands::Run(ref a) if a.publisher == Some(PublisherKind::Google)));

    assert!(Cli::try_parse_from(["budget-pacing-monitor", "run", "--publisher", "excel"]).is_err());
}

#[test]
fn test_operations_requires_url() {
    assert!(Cli::try_parse_from(["budget-pacing-monitor", "operations"]).is_err());

    let cli = Cli::try_parse_from([
        "budget-pacing-monitor",
        "operations",
        "--discovery-url",
        "https://www.googleapis.com/discovery/v1/apis/drive/v3/rest",
    ])
    .unwrap();
    match cli.command {
        Commands::Operations(args) => assert!(args.discovery_url.ends_with("drive/v3/rest")),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_config_flag_after_subcommand() {
    let cli = Cli::try_parse_from(["budget-pacing-monitor", "status", "--config", "monitor.toml"]).unwrap();
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("monitor.toml")));
}
