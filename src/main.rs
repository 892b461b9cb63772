use clap::Parser;
use pr_etl::config::{Cli, Command};
use pr_etl::core::piper::PiperPipeline;
use pr_etl::core::update;
use pr_etl::render::counts::CountChartPipeline;
use pr_etl::render::delays::DelayChartPipeline;
use pr_etl::render::links::LinksTablePipeline;
use pr_etl::utils::{logger, validation::Validate};
use pr_etl::{AccumulatePipeline, EtlEngine, LocalStorage, Result};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.config.verbose);

    tracing::info!("Starting pr-etl");
    if cli.config.verbose {
        tracing::debug!("CLI config: {:?}", cli.config);
    }

    if let Err(e) = cli.config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    match run(cli).await {
        Ok(artifact) => {
            tracing::info!("✅ Run completed successfully");
            println!("✅ Done: {}", artifact);
        }
        Err(e) => {
            tracing::error!("❌ Run failed: {}", e);
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let storage = LocalStorage::new(cli.config.output_path.clone());
    let config = cli.config;

    match cli.command {
        Command::Accumulate => {
            EtlEngine::new(AccumulatePipeline::new(storage, config)?)
                .run()
                .await
        }
        Command::PlotDelays => {
            EtlEngine::new(DelayChartPipeline::new(storage, config))
                .run()
                .await
        }
        Command::PlotCounts => {
            EtlEngine::new(CountChartPipeline::new(storage, config))
                .run()
                .await
        }
        Command::LinksTable => {
            EtlEngine::new(LinksTablePipeline::new(storage, config))
                .run()
                .await
        }
        Command::Update { force } => {
            update::run_update(storage, config, force).await?;
            Ok("update complete".to_string())
        }
        Command::PiperCommits { repo, output } => {
            EtlEngine::new(PiperPipeline::new(storage, repo.into(), output))
                .run()
                .await
        }
    }
}
