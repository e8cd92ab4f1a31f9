use std::process;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::error;

mod commands;
mod utils;

use commands::*;

fn main() {
    let matches = Command::new("ndnc")
        .version("0.1.0")
        .about("NDNC CLI - build, decode, sign and fetch Named Data Networking packets")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (default: ndnc.toml)")
                .global(true),
        )
        .arg(
            Arg::new("wire-format")
                .short('w')
                .long("wire-format")
                .value_name("VERSION")
                .help("Wire format version, 0.1 or 0.2 (overrides the config file)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("name")
                .about("Parse an NDN URI and show its components")
                .arg(Arg::new("uri").required(true).help("Name URI, e.g. /ndn/abc")),
        )
        .subcommand(
            Command::new("interest")
                .about("Encode an Interest and print it as hex")
                .arg(Arg::new("name").required(true).help("Interest name"))
                .arg(
                    Arg::new("lifetime")
                        .short('l')
                        .long("lifetime")
                        .value_name("MS")
                        .help("Interest lifetime in milliseconds"),
                )
                .arg(
                    Arg::new("must-be-fresh")
                        .short('f')
                        .long("must-be-fresh")
                        .help("Only accept fresh Data")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("nonce")
                        .long("nonce")
                        .value_name("HEX")
                        .help("Nonce bytes (default: random)"),
                ),
        )
        .subcommand(
            Command::new("decode")
                .about("Decode a hex encoded Interest, Data or LpPacket as JSON")
                .arg(Arg::new("hex").required(true).help("Packet bytes in hex")),
        )
        .subcommand(
            Command::new("fullname")
                .about("Print the full name of a hex encoded Data packet")
                .arg(Arg::new("hex").required(true).help("Data bytes in hex")),
        )
        .subcommand(
            Command::new("sign")
                .about("Build a signed Data packet and print it as hex")
                .arg(Arg::new("name").required(true).help("Data name"))
                .arg(
                    Arg::new("content")
                        .long("content")
                        .value_name("TEXT")
                        .help("Content of the Data")
                        .default_value(""),
                )
                .arg(
                    Arg::new("identity")
                        .long("identity")
                        .value_name("NAME")
                        .help("Sign with a fresh ECDSA key for this identity instead of a SHA-256 digest"),
                ),
        )
        .subcommand(
            Command::new("fetch")
                .about("Express an Interest to the configured forwarder and print the Data content")
                .arg(Arg::new("name").required(true).help("Interest name"))
                .arg(
                    Arg::new("must-be-fresh")
                        .short('f')
                        .long("must-be-fresh")
                        .help("Only accept fresh Data")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show the effective configuration")
                .arg(
                    Arg::new("init")
                        .long("init")
                        .help("Write the default configuration to the config file path")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    init_logging(matches.get_flag("verbose"));

    if let Err(e) = run_command(&matches) {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn run_command(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(matches)?;

    match matches.subcommand() {
        Some(("name", sub_matches)) => handle_name_command(sub_matches),
        Some(("interest", sub_matches)) => handle_interest_command(sub_matches),
        Some(("decode", sub_matches)) => handle_decode_command(sub_matches),
        Some(("fullname", sub_matches)) => handle_fullname_command(sub_matches),
        Some(("sign", sub_matches)) => handle_sign_command(sub_matches),
        Some(("fetch", sub_matches)) => handle_fetch_command(sub_matches, &config),
        Some(("config", sub_matches)) => handle_config_command(sub_matches, &config, &config_path(matches)),
        _ => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    }
}
