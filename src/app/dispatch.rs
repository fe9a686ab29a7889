use crate::cli::{Cli, Commands, ConsentCommands, MetricsCommands};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::Config;
use crate::app::status::{render_consent, render_metric, render_status};
use crate::pipeline::{
    ConsentSettings, ConsentStore, PersistentMetricStore, Pipeline, PipelineBuilder, Properties,
    PropertyValue, TrackOptions,
};
use crate::sinks::create_sinks;
use crate::storage::{DurableStore, create_store};

fn start_pipeline(config: &Config, store: Arc<dyn DurableStore>) -> Result<Pipeline> {
    let pipeline = PipelineBuilder::from_config(config, store)
        .with_sinks(create_sinks(&config.sinks))
        .build()
        .context("failed to start pipeline")?;

    if config.metrics.replay_on_start {
        let replayed = pipeline.replay_persisted();
        if replayed > 0 {
            info!(replayed, "replayed metrics from a previous run");
        }
    }
    Ok(pipeline)
}

/// Final flush, wait for delivery and print what happened.
async fn finish(pipeline: &Pipeline, timeout: Duration) -> Result<()> {
    let drained = pipeline.shutdown(timeout).await;
    let stats = pipeline.stats();

    println!(
        "Tracked {}, delivered {} across {} sink(s)",
        stats.tracked,
        stats.events_delivered,
        pipeline.sink_names().len()
    );
    if stats.dropped_consent > 0 {
        println!("Dropped {} event(s) without consent", stats.dropped_consent);
    }
    if stats.total_failures > 0 {
        println!("{} batch(es) failed on every sink", stats.total_failures);
    }
    if !drained {
        anyhow::bail!("deliveries still in flight after {}s", timeout.as_secs());
    }
    Ok(())
}

fn parse_properties(raw: Vec<(String, String)>) -> Properties {
    raw.into_iter()
        .map(|(key, value)| (key, PropertyValue::parse_literal(&value)))
        .collect()
}

async fn run_consent(
    command: ConsentCommands,
    config: &Config,
    store: Arc<dyn DurableStore>,
    timeout: Duration,
) -> Result<()> {
    let settings = match command {
        ConsentCommands::Show => {
            println!("{}", render_consent(ConsentStore::new(store).current().as_ref()));
            return Ok(());
        }
        ConsentCommands::Reset => {
            ConsentStore::new(store)
                .reset()
                .context("failed to reset consent")?;
            println!("Consent cleared");
            return Ok(());
        }
        ConsentCommands::AcceptAll => ConsentSettings::all(),
        ConsentCommands::DeclineAll => ConsentSettings::essential_only(),
        ConsentCommands::Set {
            analytics,
            marketing,
            personalization,
        } => ConsentSettings {
            essential: true,
            analytics,
            marketing,
            personalization,
        },
    };

    let pipeline = start_pipeline(config, store)?;
    let record = pipeline
        .update_consent(settings)
        .context("failed to save consent")?;
    println!("{}", render_consent(Some(&record)));
    finish(&pipeline, timeout).await
}

fn run_metrics(command: MetricsCommands, config: &Config, store: Arc<dyn DurableStore>) -> Result<()> {
    let metrics = PersistentMetricStore::new(store, config.metrics.cap);
    match command {
        MetricsCommands::List => {
            let stored = metrics.load_all();
            if stored.is_empty() {
                println!("No persisted metrics");
            }
            for event in &stored {
                println!("{}", render_metric(event));
            }
            Ok(())
        }
        MetricsCommands::Clear => {
            metrics.clear().context("failed to clear persisted metrics")?;
            println!("Persisted metrics cleared");
            Ok(())
        }
    }
}

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    let store = create_store(&config.storage);
    let timeout = Duration::from_secs(cli.timeout_secs);

    match cli.command {
        Commands::Track {
            name,
            properties,
            category,
            immediate,
            persist,
        } => {
            let pipeline = start_pipeline(&config, store)?;
            let options = TrackOptions {
                send_immediately: immediate,
                category,
                persist,
            };
            pipeline.track_event(&name, parse_properties(properties), options);
            finish(&pipeline, timeout).await
        }

        Commands::PageView { title, path } => {
            let pipeline = start_pipeline(&config, store)?;
            pipeline.track_page_view(&title, &path, Properties::new());
            finish(&pipeline, timeout).await
        }

        Commands::Consent { consent_command } => {
            run_consent(consent_command, &config, store, timeout).await
        }

        Commands::Metrics { metrics_command } => run_metrics(metrics_command, &config, store),

        Commands::Replay => {
            let config = Config {
                metrics: crate::config::MetricsConfig {
                    replay_on_start: false,
                    ..config.metrics.clone()
                },
                ..config.as_ref().clone()
            };
            let pipeline = start_pipeline(&config, store)?;
            let replayed = pipeline.replay_persisted();
            println!("Replaying {replayed} persisted metric(s)");
            finish(&pipeline, timeout).await
        }

        Commands::Status => {
            let consent = ConsentStore::new(Arc::clone(&store)).current();
            let persisted = PersistentMetricStore::new(store, config.metrics.cap)
                .load_all()
                .len();
            println!("{}", render_status(&config, consent.as_ref(), persisted));
            Ok(())
        }
    }
}
