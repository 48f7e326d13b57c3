//! nfctap command-line front end.
//!
//! # Usage
//!
//! ```bash
//! # Read the next tag through the simulator
//! nfctap --simulate read
//!
//! # Write text to an NDEF tag on a PC/SC reader (needs the `pcsc` feature)
//! nfctap write "meeting room 4"
//!
//! # Overwrite block 4 of a MIFARE card (advanced, must be allowed)
//! nfctap raw-write "ROOM 12" --allow-raw
//!
//! # Engine settings from a JSON file
//! nfctap --config nfctap.json read --json
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use nfctap_core::{ReadResult, VERSION};
use nfctap_engine::{EngineConfig, Platform, TagEngine};
use nfctap_hardware::{AnyRadioDevice, RadioDevice};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod simulate;

/// nfctap command line interface
#[derive(Parser, Debug)]
#[command(name = "nfctap")]
#[command(author, version, about = "Read and write text on NFC tags")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use a simulated radio that presents a demo tag
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Platform whose read technologies are requested
    #[arg(long, value_enum, global = true)]
    pub platform: Option<PlatformArg>,

    /// Seconds to wait for a tag
    #[arg(short, long, global = true)]
    pub timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Wait for a tag and print what it holds
    Read {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write text to an NDEF tag
    Write {
        /// Text to store
        text: String,
    },

    /// Overwrite one MIFARE block with raw text (advanced)
    RawWrite {
        /// Text to store, at most 16 bytes
        text: String,

        /// Block to overwrite
        #[arg(long)]
        block: Option<u8>,

        /// Allow raw block writes for this run
        #[arg(long)]
        allow_raw: bool,
    },

    /// Show reader information
    Info,
}

/// Platform argument enum for CLI
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformArg {
    Android,
    Ios,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Android => Platform::Android,
            PlatformArg::Ios => Platform::Ios,
        }
    }
}

/// Load the engine configuration and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(platform) = cli.platform {
        config = config.with_platform(platform.into());
    }
    if let Some(seconds) = cli.timeout {
        config = config.with_acquire_timeout(Duration::from_secs(seconds));
    }
    if let Commands::RawWrite {
        block, allow_raw, ..
    } = &cli.command
    {
        if let Some(block) = block {
            config.raw_block_write.block = *block;
        }
        if *allow_raw {
            config.raw_block_write.enabled = true;
        }
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Build the radio selected on the command line and run the command.
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let radio = if cli.simulate {
        let (radio, handle) = simulate::radio();
        simulate::present_demo_tag(handle, &cli.command);
        radio
    } else {
        hardware_radio()?
    };

    let engine = TagEngine::new(radio, config);
    let output = execute(&engine, cli.command).await?;
    println!("{output}");
    Ok(())
}

/// Run one command against `engine`, returning what to print.
pub async fn execute<R: RadioDevice>(engine: &TagEngine<R>, command: Commands) -> Result<String> {
    match command {
        Commands::Read { json } => {
            engine.start().await?;
            let result = engine.request_read().await;
            if json {
                return Ok(serde_json::to_string_pretty(&result)?);
            }
            match result {
                ReadResult::Text(text) => Ok(text),
                ReadResult::RawInfo(info) => Ok(info.to_string().trim_end().to_string()),
                ReadResult::Failure(e) => bail!("Read failed ({}): {e}", e.kind()),
            }
        }
        Commands::Write { text } => {
            engine.start().await?;
            engine.request_write(&text).await?;
            Ok("Message written to NFC tag".to_string())
        }
        Commands::RawWrite { text, .. } => {
            engine.start().await?;
            engine.request_raw_block_write(&text).await?;
            Ok(format!(
                "Block {} written",
                engine.config().raw_block_write.block
            ))
        }
        Commands::Info => {
            let info = engine.reader_info().await?;
            let mut lines = vec![
                format!("name: {}", info.name),
                format!("protocols: {}", info.protocols.join(", ")),
            ];
            if let Some(baud) = info.max_baud_rate {
                lines.push(format!("max baud rate: {baud}"));
            }
            lines.push(format!("nfctap version: {VERSION}"));
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(feature = "pcsc")]
fn hardware_radio() -> Result<AnyRadioDevice> {
    let radio = nfctap_hardware::pcsc_reader::PcscRadio::open()
        .context("Failed to open a PC/SC reader")?;
    Ok(AnyRadioDevice::Pcsc(radio))
}

#[cfg(not(feature = "pcsc"))]
fn hardware_radio() -> Result<AnyRadioDevice> {
    bail!("built without PC/SC support; rerun with --simulate or enable the `pcsc` feature")
}
