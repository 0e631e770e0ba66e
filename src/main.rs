use clap::Parser;
use soil_etl::utils::{logger, validation::Validate};
use soil_etl::{CliConfig, EtlEngine, EtlError, SoilPipeline};

fn fail(e: &EtlError) -> ! {
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting soil-etl");

    let config = match cli.resolve().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            fail(&e);
        }
    };
    tracing::debug!("Resolved config: {:?}", config.source);

    let pipeline = match SoilPipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(&e),
    };
    let engine = EtlEngine::new_with_monitoring(pipeline, config.monitoring_enabled());

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        match engine.preview().await {
            Ok(dataset) => {
                println!("{}", serde_json::to_string_pretty(&dataset)?);
                return Ok(());
            }
            Err(e) => fail(&e),
        }
    }

    match engine.run().await {
        Ok(summary) => {
            println!(
                "✅ Wrote {} readings to {}",
                summary.rows_written, summary.destination
            );
            Ok(())
        }
        Err(e) => fail(&e),
    }
}
