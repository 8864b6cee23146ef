use std::path::PathBuf;

use clap::Parser;
use rackhouse::config::{Cli, Config};

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.bind_address, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.backlog, 10);
    assert_eq!(cfg.app_file, PathBuf::from("app.yaml"));
    assert_eq!(cfg.listen_addr(), "127.0.0.1:8080");
}

#[test]
fn test_config_custom_address() {
    let cfg = Config::new("0.0.0.0", 3000);

    assert_eq!(cfg.listen_addr(), "0.0.0.0:3000");
    assert_eq!(cfg.backlog, 10);
}

#[test]
fn test_config_ipv6_is_bracketed() {
    assert_eq!(Config::new("::1", 9000).listen_addr(), "[::1]:9000");
    assert_eq!(Config::new("[::1]", 9000).listen_addr(), "[::1]:9000");
}

#[test]
fn test_config_hostname() {
    assert_eq!(Config::new("localhost", 80).listen_addr(), "localhost:80");
}

#[test]
fn test_cli_no_arguments() {
    let cfg = Config::from(Cli::try_parse_from(["rackhouse"]).unwrap());

    assert_eq!(cfg, Config::default());
}

#[test]
fn test_cli_address_only() {
    let cfg = Config::from(Cli::try_parse_from(["rackhouse", "0.0.0.0"]).unwrap());

    assert_eq!(cfg.bind_address, "0.0.0.0");
    assert_eq!(cfg.port, 8080);
}

#[test]
fn test_cli_address_and_port() {
    let cfg = Config::from(Cli::try_parse_from(["rackhouse", "0.0.0.0", "5000"]).unwrap());

    assert_eq!(cfg.listen_addr(), "0.0.0.0:5000");
}

#[test]
fn test_cli_rejects_bad_port() {
    assert!(Cli::try_parse_from(["rackhouse", "0.0.0.0", "http"]).is_err());
    assert!(Cli::try_parse_from(["rackhouse", "0.0.0.0", "70000"]).is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::new("10.0.0.1", 81);
    let cfg2 = cfg1.clone();

    assert_eq!(cfg1, cfg2);
}
