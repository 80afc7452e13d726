use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use tokio::signal::ctrl_c;
use tokio::time::interval;

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::device::connection::BtleTransport;
use crate::device::dispatch::Listener;
use crate::device::scanner::{scan, WandFilter};
use crate::device::transport::Transport;
use crate::device::types::{EventKind, PatternCode};
use crate::device::wand::Wand;
use crate::error::AppRunError;

#[derive(Debug, Parser)]
#[command(name = "kano-wand", version, about = "Talk to Kano coding wands over Bluetooth LE")]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info }
    }
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Advertised name prefix of the wand
    #[arg(long, conflicts_with = "mac")]
    pub prefix: Option<String>,

    /// MAC address of the wand
    #[arg(long)]
    pub mac: Option<String>,

    /// How long to scan, in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl FilterArgs {
    fn filter(&self, config: &Config) -> WandFilter {
        match (&self.prefix, &self.mac) {
            (Some(prefix), _) => WandFilter::prefix(prefix.clone()),
            (None, Some(mac)) => WandFilter::mac(mac.clone()),
            (None, None) => config.scan.filter(),
        }
    }

    fn timeout(&self, config: &Config) -> Duration {
        self.timeout.map(Duration::from_millis).unwrap_or_else(|| config.scan.timeout())
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List nearby wands
    Scan {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print the metadata and sensor values of the first wand found
    Info {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Log every notification of the first wand found until Ctrl-C
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Vibrate with a named pattern (regular, short, burst, long, short-long, short-short, big-pause) or a raw code
    Vibrate {
        pattern: PatternCode,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Set the LED color, e.g. "#2185d0"; without a color the configured LED setting is applied
    Led {
        color: Option<String>,

        #[arg(long)]
        off: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Reset the orientation of the wand
    ResetPosition {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Write the default config file if none exists
    InitConfig,
}

// A color given on the command line turns the LED on unless `--off` is passed
fn led_setting(color: Option<String>, off: bool, config: &Config) -> (String, bool) {
    match color {
        Some(color) => (color, !off),
        None => (config.led.color.clone(), !off && config.led.on),
    }
}

async fn connect_first(transport: Arc<dyn Transport>, filter: &FilterArgs, config: &Config) -> Result<Wand, AppRunError> {
    let wands = scan(transport, &filter.filter(config), filter.timeout(config), false).await?;
    let mut wand = wands.into_iter().next().ok_or(AppRunError::NoWandFound)?;
    wand.connect().await?;
    Ok(wand)
}

async fn finish(mut wand: Wand) -> Result<(), AppRunError> {
    wand.disconnect().await?;
    wand.shutdown().await?;
    Ok(())
}

async fn watch(mut wand: Wand, config: &Config) -> Result<(), AppRunError> {
    wand.register("log", Listener::position(|o| {
        info!("Position: x={} y={} pitch={} roll={}", o.x, o.y, o.pitch, o.roll)
    }))?;
    wand.register("log", Listener::button(|pressed| info!("Button pressed: {}", pressed)))?;
    wand.register("log", Listener::temperature(|value| info!("Temperature: {}", value)))?;
    wand.register("log", Listener::battery(|value| info!("Battery: {}", value)))?;

    for kind in EventKind::ALL {
        wand.subscribe(kind).await?;
    }

    let mut keep_alive = interval(config.keep_alive_interval().max(Duration::from_millis(1)));
    let stop = ctrl_c();
    tokio::pin!(stop);

    'mainloop: loop {
        tokio::select! {
            _ = &mut stop => {
                break 'mainloop;
            },
            _ = keep_alive.tick() => {
                if let Err(err) = wand.keep_alive().await {
                    warn!("Failed to send keep-alive: {}", err);
                }
            },
        }
    }

    for kind in EventKind::ALL {
        wand.unsubscribe(kind, false).await?;
    }

    finish(wand).await
}

pub async fn run(cli: Cli) -> Result<(), AppRunError> {
    let config_io = ConfigIO::locate(cli.config.clone())?;

    if let Command::InitConfig = cli.command {
        if config_io.path().exists() {
            println!("Config file already exists: {}", config_io.path().to_string_lossy());
        } else {
            config_io.save(&Config::default()).await?;
            println!("Wrote {}", config_io.path().to_string_lossy());
        }
        return Ok(());
    }

    let config = config_io.read().await?;
    let transport: Arc<dyn Transport> = Arc::new(BtleTransport::new().await?);

    match cli.command {
        Command::Scan { filter } => {
            let wands = scan(transport, &filter.filter(&config), filter.timeout(&config), false).await?;
            for wand in wands {
                println!("{}\t{}", wand.address(), wand.name().unwrap_or(""));
                wand.shutdown().await?;
            }
        },
        Command::Info { filter } => {
            let wand = connect_first(transport, &filter, &config).await?;
            println!("Name:         {}", wand.name().unwrap_or(""));
            println!("Address:      {}", wand.address());
            println!("Organization: {}", wand.organization().await?);
            println!("Software:     {}", wand.software_version().await?);
            println!("Hardware:     {}", wand.hardware_version().await?);
            println!("Battery:      {}", wand.battery().await?);
            println!("Button:       {}", wand.button().await?);
            println!("Temperature:  {}", wand.temperature().await?);
            finish(wand).await?;
        },
        Command::Watch { filter } => {
            let wand = connect_first(transport, &filter, &config).await?;
            watch(wand, &config).await?;
        },
        Command::Vibrate { pattern, filter } => {
            let wand = connect_first(transport, &filter, &config).await?;
            wand.vibrate(pattern).await?;
            finish(wand).await?;
        },
        Command::Led { color, off, filter } => {
            let (color, on) = led_setting(color, off, &config);
            let wand = connect_first(transport, &filter, &config).await?;
            wand.set_led(&color, on).await?;
            finish(wand).await?;
        },
        Command::ResetPosition { filter } => {
            let wand = connect_first(transport, &filter, &config).await?;
            wand.reset_position().await?;
            finish(wand).await?;
        },
        Command::InitConfig => {},
    }

    Ok(())
}
