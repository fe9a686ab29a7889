use crate::pipeline::EventCategory;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `pulsegate` - Consent-aware analytics event batching.
#[derive(Parser, Debug)]
#[command(name = "pulsegate")]
#[command(version)]
#[command(about = "Consent-aware analytics event batching pipeline.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.pulsegate/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seconds to wait for in-flight deliveries before exiting
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track one event and deliver it
    Track {
        /// Event name
        name: String,

        /// Property as key=value (repeatable); values are parsed as
        /// null, bool, integer or float where possible
        #[arg(short = 'p', long = "prop", value_parser = parse_property)]
        properties: Vec<(String, String)>,

        /// Consent category (essential, analytics, marketing, personalization)
        #[arg(short, long, default_value_t = EventCategory::Analytics)]
        category: EventCategory,

        /// Skip the debounce and flush right away
        #[arg(long)]
        immediate: bool,

        /// Also keep the event in the persistent metric store
        #[arg(long)]
        persist: bool,
    },

    /// Track a page view
    PageView {
        /// Page title
        title: String,

        /// Page path
        path: String,
    },

    /// Inspect or change consent
    Consent {
        #[command(subcommand)]
        consent_command: ConsentCommands,
    },

    /// Inspect the persistent metric store
    Metrics {
        #[command(subcommand)]
        metrics_command: MetricsCommands,
    },

    /// Deliver metrics persisted by earlier runs, then clear them
    Replay,

    /// Show configuration, consent and store status
    Status,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentCommands {
    /// Print the current consent record
    Show,
    /// Grant every category
    AcceptAll,
    /// Keep essential only
    DeclineAll,
    /// Forget every decision
    Reset,
    /// Grant exactly the given categories (essential is implied)
    Set {
        #[arg(long)]
        analytics: bool,
        #[arg(long)]
        marketing: bool,
        #[arg(long)]
        personalization: bool,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsCommands {
    /// List persisted metrics, oldest first
    List,
    /// Delete every persisted metric
    Clear,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("property key is empty in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}
