use clap::Parser;
use color_eyre::Result;
use logstash_exporter::{
    init_errors,
    init_logging,
    run,
};
use logstash_exporter_config::{
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let config = Config::new(Args::parse())?;
    init_logging(&config.log_level)?;
    config.validate()?;
    run(config).await
}
