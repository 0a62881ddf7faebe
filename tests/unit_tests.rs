use clap::Parser;
use search_sync::SyncOpts;

#[test]
fn test_sync_opts_creation() {
    let opts = SyncOpts {
        index: "movies".to_string(),
        batch_size: 1000,
        poll_interval_secs: 10,
    };

    assert_eq!(opts.index, "movies");
    assert_eq!(opts.batch_size, 1000);
    assert_eq!(opts.poll_interval_secs, 10);
    assert!(opts.validate().is_ok());
}

#[test]
fn test_batch_size_flag_parses() {
    let opts = SyncOpts::try_parse_from(["search-sync", "--batch-size", "500"]).unwrap();
    assert_eq!(opts.batch_size, 500);
}

#[test]
fn test_zero_batch_size_is_rejected() {
    let result = SyncOpts::try_parse_from(["search-sync", "--batch-size", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_zero_poll_interval_is_allowed() {
    let opts = SyncOpts::try_parse_from(["search-sync", "--poll-interval-secs", "0"]).unwrap();
    assert_eq!(opts.poll_interval_secs, 0);
}

#[test]
fn test_blank_index_name_fails_validation() {
    let opts = SyncOpts {
        index: "   ".to_string(),
        batch_size: 1000,
        poll_interval_secs: 10,
    };

    assert!(opts.validate().is_err());
}
