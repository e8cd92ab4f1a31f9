use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use clap::ArgMatches;
use log::{debug, info};

use ndnc_core::security::key_chain::key_name_to_certificate_name;
use ndnc_core::{set_default_wire_format, Config, Data, Interest, KeyChain, MemoryKeyStore, Name};
use ndnc_transport::{Face, TcpTransport};

use crate::utils::{describe_name, describe_packet, parse_hex};

const DEFAULT_CONFIG_PATH: &str = "ndnc.toml";

/// How often `fetch` polls the face
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn config_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load the config file and make its wire format the process default
pub fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let path = config_path(matches);
    let mut config = Config::load(&path).with_context(|| format!("Cannot load {}", path.display()))?;
    if let Some(version) = matches.get_one::<String>("wire-format") {
        config.encoding.default_wire_format = version.clone();
    }

    let format = config.encoding.wire_format()?;
    set_default_wire_format(format);
    debug!("Using wire format {}", format.name());
    Ok(config)
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> anyhow::Result<&'a String> {
    matches
        .get_one::<String>(id)
        .ok_or_else(|| anyhow!("Missing argument <{}>", id))
}

fn parse_name(uri: &str) -> anyhow::Result<Name> {
    Name::from_uri(uri).with_context(|| format!("Invalid name {}", uri))
}

pub fn handle_name_command(matches: &ArgMatches) -> anyhow::Result<()> {
    let name = parse_name(required(matches, "uri")?)?;
    println!("{}", serde_json::to_string_pretty(&describe_name(&name))?);
    Ok(())
}

pub fn handle_interest_command(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut interest = Interest::new(parse_name(required(matches, "name")?)?);
    interest.set_must_be_fresh(matches.get_flag("must-be-fresh"));
    if let Some(lifetime) = matches.get_one::<String>("lifetime") {
        let millis: u64 = lifetime.parse().context("Lifetime must be a number of milliseconds")?;
        interest.set_interest_lifetime(Some(Duration::from_millis(millis)));
    }
    if let Some(nonce) = matches.get_one::<String>("nonce") {
        interest.set_nonce(parse_hex(nonce)?);
    }

    let encoding = interest.wire_encode()?;
    info!("Encoded {}", interest.to_uri());
    println!("{}", hex::encode(encoding.bytes()));
    Ok(())
}

pub fn handle_decode_command(matches: &ArgMatches) -> anyhow::Result<()> {
    let bytes = parse_hex(required(matches, "hex")?)?;
    let summary = describe_packet(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub fn handle_fullname_command(matches: &ArgMatches) -> anyhow::Result<()> {
    let bytes = parse_hex(required(matches, "hex")?)?;
    let mut data = Data::wire_decode(&bytes).context("Not a Data packet")?;
    println!("{}", data.full_name()?.to_uri());
    Ok(())
}

pub fn handle_sign_command(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut data = Data::new(parse_name(required(matches, "name")?)?);
    if let Some(content) = matches.get_one::<String>("content") {
        data.set_content(content.as_bytes().to_vec());
    }

    match matches.get_one::<String>("identity") {
        Some(identity) => {
            let mut key_name = parse_name(identity)?;
            key_name.append("key1");
            let mut certificate_name = key_name_to_certificate_name(&key_name)?;
            certificate_name.append_version(0);

            let mut key_store = MemoryKeyStore::new();
            key_store.generate_ecdsa_key_pair(key_name)?;
            KeyChain::new(key_store).sign_data(&mut data, &certificate_name)?;
            info!("Signed with {}", certificate_name);
        }
        None => KeyChain::new(MemoryKeyStore::new()).sign_data_with_sha256(&mut data)?,
    }

    println!("{}", hex::encode(data.wire_encode()?.bytes()));
    Ok(())
}

pub fn handle_fetch_command(matches: &ArgMatches, config: &Config) -> anyhow::Result<()> {
    let mut interest = Interest::new(parse_name(required(matches, "name")?)?);
    interest.set_must_be_fresh(matches.get_flag("must-be-fresh"));

    let mut transport = TcpTransport::with_max_packet_size(config.face.max_packet_size);
    transport
        .connect((config.face.host.as_str(), config.face.port))
        .with_context(|| format!("Cannot connect to {}:{}", config.face.host, config.face.port))?;
    let mut face = Face::from_config(transport, config)?;

    let result: Rc<RefCell<Option<anyhow::Result<Vec<u8>>>>> = Rc::new(RefCell::new(None));
    let on_data = result.clone();
    let on_timeout = result.clone();
    let on_nack = result.clone();
    face.express_interest_with_nack(
        interest,
        move |_, data| *on_data.borrow_mut() = Some(Ok(data.content().to_vec())),
        move |interest| *on_timeout.borrow_mut() = Some(Err(anyhow!("Interest {} timed out", interest.name()))),
        move |interest, nack| {
            *on_nack.borrow_mut() = Some(Err(anyhow!("Interest {} nacked: {}", interest.name(), nack.reason)))
        },
    )?;

    loop {
        face.process_events(Instant::now())?;
        if let Some(outcome) = result.borrow_mut().take() {
            let content = outcome?;
            println!("{}", String::from_utf8_lossy(&content));
            break;
        }
        if !face.is_connected() {
            bail!("Connection closed by the forwarder");
        }
        thread::sleep(POLL_INTERVAL);
    }

    face.shutdown()?;
    Ok(())
}

pub fn handle_config_command(matches: &ArgMatches, config: &Config, path: &Path) -> anyhow::Result<()> {
    if matches.get_flag("init") {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        Config::default().save(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
