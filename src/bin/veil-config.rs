//! veil configuration tool
//!
//! Usage: veil-config [OPTIONS]
//!
//! Options:
//!   -g, --generate            Generate a new server configuration
//!   --show-pubkey <FILE>      Show the public key clients need
//!   --check <FILE>            Parse and validate a configuration
//!   --add-method <FILE> <METHOD> <UPSTREAM>
//!                             Enable a proxy method in a configuration
//!   -h, --help                Print help information

use std::env;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine};

use veil::{ServerConfig, ServerConfigFile};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "-h" | "--help" => {
            print_usage();
        }
        "-g" | "--generate" => {
            generate_config()?;
        }
        "--show-pubkey" => {
            let Some(path) = args.get(2) else {
                eprintln!("Error: --show-pubkey requires a config file path");
                return Ok(());
            };
            show_pubkey(path)?;
        }
        "--check" => {
            let Some(path) = args.get(2) else {
                eprintln!("Error: --check requires a config file path");
                return Ok(());
            };
            check_config(path)?;
        }
        "--add-method" => {
            if args.len() < 5 {
                eprintln!("Error: --add-method requires <FILE> <METHOD> <UPSTREAM>");
                return Ok(());
            }
            add_method(&args[2], &args[3], &args[4])?;
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"veil-config - camouflage handshake server configuration

USAGE:
    veil-config [OPTIONS]

OPTIONS:
    -g, --generate                          Generate new server configuration
    --show-pubkey <FILE>                    Show server public key from existing config
    --check <FILE>                          Parse and validate a configuration
    --add-method <FILE> <METHOD> <UPSTREAM> Enable a proxy method and update config
    -h, --help                              Print help information

EXAMPLES:
    Generate a new configuration:
        veil-config --generate > server.toml

    Enable a proxy method:
        veil-config --add-method server.toml shadowsocks 127.0.0.1:8388

    Show public key for clients:
        veil-config --show-pubkey server.toml
"#
    );
}

fn load(config_path: &str) -> anyhow::Result<(ServerConfigFile, ServerConfig)> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("cannot read {}", config_path))?;
    let config_file = ServerConfigFile::from_toml(&content)?;
    let config = config_file.to_config()?;
    Ok((config_file, config))
}

fn render(config_file: &ServerConfigFile) -> anyhow::Result<String> {
    let mut output = String::new();
    output.push_str("# veil server configuration\n");
    output.push_str(&format!("# Generated: {}\n\n", chrono::Utc::now()));
    output.push_str(&config_file.to_toml()?);
    Ok(output)
}

fn generate_config() -> anyhow::Result<()> {
    let config = ServerConfig::new_random();
    let public_key = config.public_key();

    println!("{}", render(&ServerConfigFile::from_config(&config))?);
    println!("[proxy_book]");
    println!("# shadowsocks = \"127.0.0.1:8388\"");
    println!();
    println!("# Client connection info:");
    println!("# Server Public Key (base64): {}", STANDARD.encode(public_key.as_bytes()));
    println!("# Server Public Key (hex): {}", hex::encode(public_key.as_bytes()));

    Ok(())
}

fn show_pubkey(config_path: &str) -> anyhow::Result<()> {
    let (_, config) = load(config_path)?;
    let public_key = config.public_key();

    println!("Server Public Key (base64): {}", STANDARD.encode(public_key.as_bytes()));
    println!("Server Public Key (hex): {}", hex::encode(public_key.as_bytes()));

    Ok(())
}

fn check_config(config_path: &str) -> anyhow::Result<()> {
    let (_, config) = load(config_path)?;
    config.validate()?;

    let mut methods: Vec<_> = config.proxy_book.iter().collect();
    methods.sort();

    tracing::info!("{} is valid", config_path);
    println!(
        "Replay window: {}s, capacity {}",
        config.replay_window.as_secs(),
        config.replay_capacity
    );
    println!("Proxy methods:");
    for (method, upstream) in methods {
        println!("  {} -> {}", method, upstream);
    }

    Ok(())
}

fn add_method(config_path: &str, method: &str, upstream: &str) -> anyhow::Result<()> {
    let (mut config_file, _) = load(config_path)?;

    if let Some(previous) = config_file
        .proxy_book
        .insert(method.to_string(), upstream.to_string())
    {
        tracing::warn!("replacing upstream {} for {}", previous, method);
    }
    config_file.to_config()?.validate()?;

    std::fs::write(config_path, render(&config_file)?)
        .with_context(|| format!("cannot write {}", config_path))?;

    println!("Enabled {} -> {}", method, upstream);
    Ok(())
}
