use clap::Parser;
use browser_agent::cli::commands::{RunOptions, cmd_detect, cmd_parse, cmd_run};
use browser_agent::cli::config::{Cli, Commands, build_agent_config, load_config, resolve_service};
use browser_agent::cli::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Run {
            task,
            url,
            plan,
            max_iterations,
            settle_ms,
            trace,
            headed,
        } => {
            // Resolve service settings: CLI > config > env > defaults
            let service = resolve_service(
                cli.endpoint.as_deref(),
                cli.api_key.as_deref(),
                &config.service,
                |key| std::env::var(key).ok(),
            );
            let trace = trace.or_else(|| config.trace.path.clone());

            let succeeded = cmd_run(RunOptions {
                task: &task,
                url: &url,
                plan: plan.as_deref(),
                trace: trace.as_deref(),
                headless: config.browser.headless && !headed,
                agent: build_agent_config(&config.agent, max_iterations, settle_ms),
                service,
                browser: &config.browser,
            })
            .await?;
            if !succeeded {
                std::process::exit(1);
            }
        }
        Commands::Detect { url, json, headed } => {
            cmd_detect(&url, json, &config.browser, config.browser.headless && !headed).await?;
        }
        Commands::Parse { text } => cmd_parse(&text),
    }

    Ok(())
}
