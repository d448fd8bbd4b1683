use anyhow::{Context, Result};
use chrono::Local;
use eval::{config::Config, utils::FILE_STRFTIME};
use std::{env, path::PathBuf, sync::Arc};
use structopt::StructOpt;
use tracing::{info_span, Instrument};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Clone, StructOpt)]
/// Evaluate HOI detection model
struct Args {
    #[structopt(long)]
    /// experiment name, defaults to the current time
    pub exp: Option<String>,
    #[structopt(long, default_value = "eval.json5")]
    /// configuration file
    pub config_file: PathBuf,
}

#[tokio::main]
pub async fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // parse arguments
    let Args { exp, config_file } = Args::from_args();
    let exp = exp.unwrap_or_else(|| format!("{}", Local::now().format(FILE_STRFTIME)));
    let config = Arc::new(
        Config::open(&config_file)
            .with_context(|| format!("failed to load config file '{}'", config_file.display()))?,
    );

    // start evaluation program
    eval::start(config, &exp)
        .instrument(info_span!("eval", exp = %exp))
        .await?;

    Ok(())
}
