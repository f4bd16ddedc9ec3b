use std::sync::Arc;

use anyhow::{Context, Result};
use taxopeek_config::{config_path, ensure_workspace_config, validate_config};
use taxopeek_sources::{SourceOverrides, load_resolver_from_config};
use taxopeekd::cli::{Cli, Commands, parse_cli};
use taxopeekd::logging::init_tracing;
use taxopeekd::preview::{run_extract_once, run_place_once, run_resolve_once};
use taxopeekd::serve::run_serve;

fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.log_format);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let workspace = cli.workspace.canonicalize().with_context(|| {
        format!(
            "failed to resolve workspace path {}",
            cli.workspace.display()
        )
    })?;

    let config = ensure_workspace_config(&workspace).with_context(|| {
        format!(
            "failed to load or create workspace config at {}",
            config_path(&workspace).display()
        )
    })?;
    for warning in validate_config(&config) {
        eprintln!(
            "taxopeek config warning [{}]: {}",
            warning.code, warning.message
        );
    }

    let mut out = std::io::stdout();
    match cli.command {
        Commands::Extract(args) => {
            run_extract_once(&args.file, args.base_url.as_deref(), &config.extract, &mut out)
        }
        Commands::Place(args) => run_place_once(
            args.anchor,
            args.viewport,
            args.popup,
            &config.placement,
            &mut out,
        ),
        Commands::Resolve(args) => build_runtime()?.block_on(run_resolve_once(
            &workspace,
            &args.subject,
            cli.provider,
            args.output,
            &mut out,
        )),
        Commands::Serve => {
            let runtime = build_runtime()?;
            runtime.block_on(async {
                let loaded = load_resolver_from_config(
                    &workspace,
                    SourceOverrides {
                        provider: cli.provider,
                        ..SourceOverrides::default()
                    },
                )
                .context("failed to load reference sources")?;
                tracing::info!(provider = %loaded.provider_name, "serving hover previews on stdio");

                let input = tokio::io::BufReader::new(tokio::io::stdin());
                let output = tokio::io::stdout();
                run_serve(Arc::new(loaded.resolver), &loaded.config, input, output).await
            })
        }
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}
