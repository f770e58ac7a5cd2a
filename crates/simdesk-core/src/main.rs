//! `simdesk` command line

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use parking_lot::Mutex;
use simdesk_core::{spawn_driver, Desktop, DesktopConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("simdesk")
        .version(simdesk_core::VERSION)
        .about("Simulated desktop: WiFi networks and app installs")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Random seed for reproducibility (overrides the config file)"),
        )
        .subcommand(
            Command::new("networks")
                .about("Scan and print the visible networks")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Connect and install an app under simulated time")
                .arg(
                    Arg::new("app")
                        .long("app")
                        .default_value("paint")
                        .help("App to install"),
                )
                .arg(
                    Arg::new("size")
                        .long("size")
                        .default_value("50")
                        .value_parser(value_parser!(f64))
                        .help("Download size in MB"),
                )
                .arg(
                    Arg::new("ssid")
                        .long("ssid")
                        .help("Network to join (default: first visible)"),
                )
                .arg(
                    Arg::new("user")
                        .long("user")
                        .default_value("root")
                        .help("Acting user"),
                )
                .arg(
                    Arg::new("step-ms")
                        .long("step-ms")
                        .default_value("500")
                        .value_parser(value_parser!(u64))
                        .help("Simulated time between progress reports"),
                )
                .arg(
                    Arg::new("max-secs")
                        .long("max-secs")
                        .default_value("3600")
                        .value_parser(value_parser!(u64))
                        .help("Give up after this much simulated time"),
                ),
        )
        .subcommand(
            Command::new("live")
                .about("Run the desktop in real time and print its final state")
                .arg(
                    Arg::new("secs")
                        .long("secs")
                        .default_value("5")
                        .value_parser(value_parser!(u64))
                        .help("Seconds to run"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<DesktopConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => DesktopConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DesktopConfig::default(),
    };
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }
    Ok(config)
}

fn print_networks(desktop: &Desktop) {
    println!("{:<24} {:>4} {:>5} {:>3} {:>8}", "SSID", "SIG", "SEC", "CH", "MBPS");
    for net in desktop.available_networks() {
        let marker = if net.is_connected() { "*" } else { " " };
        println!(
            "{marker}{:<23} {:>3}% {:>5} {:>3} {:>8.1}",
            net.ssid(),
            net.strength(),
            net.security().to_string(),
            net.channel(),
            net.speed()
        );
    }
}

fn run_networks(config: DesktopConfig, args: &ArgMatches) -> Result<()> {
    let mut desktop = Desktop::in_memory(config)?;
    let scan_delay = desktop.config().network.scan_delay();
    desktop.scan_networks()?;
    desktop.advance(scan_delay);

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&desktop.snapshot())?);
    } else {
        print_networks(&desktop);
    }
    Ok(())
}

fn run_simulate(config: DesktopConfig, args: &ArgMatches) -> Result<()> {
    let app = args
        .get_one::<String>("app")
        .context("missing --app")?
        .clone();
    let size = *args.get_one::<f64>("size").context("missing --size")?;
    let user = args.get_one::<String>("user").context("missing --user")?.clone();
    let step = Duration::from_millis(*args.get_one::<u64>("step-ms").context("missing --step-ms")?);
    let max = Duration::from_secs(*args.get_one::<u64>("max-secs").context("missing --max-secs")?);

    let mut desktop = Desktop::in_memory(config)?;
    let ssid = match args.get_one::<String>("ssid") {
        Some(ssid) => ssid.clone(),
        None => match desktop.available_networks().first() {
            Some(net) => net.ssid().to_string(),
            None => bail!("no networks visible"),
        },
    };

    desktop.connect_to_network(&ssid);
    println!("connected to {ssid} at {:.1} Mbps", desktop.current_speed());

    let outcome = desktop.handle_install(&app, size, Some(&user))?;
    println!("install of {app} ({size} MB) as {user}: {outcome:?}");

    let deadline = desktop.now() + max;
    while desktop.installing_apps().contains_key(app.as_str()) {
        if desktop.now() >= deadline {
            bail!("{app} did not finish within {}s", max.as_secs());
        }
        desktop.advance(step);
        let percent = desktop.installing_apps().get(app.as_str()).copied();
        match (percent, desktop.job_phase(&app)) {
            (Some(percent), Some(phase)) => println!(
                "{:>10}  {percent:>3}%  {:<11} {:.1} Mbps",
                desktop.now().to_string(),
                phase.to_string(),
                desktop.current_speed()
            ),
            _ => println!("{:>10}  done", desktop.now().to_string()),
        }
    }

    println!("{app} broken: {}", desktop.is_app_broken(&app));
    desktop.shutdown();
    Ok(())
}

async fn run_live(config: DesktopConfig, args: &ArgMatches) -> Result<()> {
    let secs = *args.get_one::<u64>("secs").context("missing --secs")?;
    let period = config.driver_period();

    let desktop = Arc::new(Mutex::new(Desktop::in_memory(config)?));
    desktop.lock().scan_networks()?;

    let driver = spawn_driver(Arc::clone(&desktop), period);
    tokio::time::sleep(Duration::from_secs(secs)).await;
    driver.shutdown().await;

    let snapshot = desktop.lock().snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("networks", args)) => run_networks(config, args),
        Some(("simulate", args)) => run_simulate(config, args),
        Some(("live", args)) => run_live(config, args).await,
        _ => unreachable!("subcommand_required"),
    }
}
