use std::{collections::HashMap, fs, path::Path, process, sync::Arc};

use collate::{
    application::{
        AggregationConfig, Aggregator, Collaborators, ThemeProcessor, error::AppError,
    },
    cache::{CacheConfig, CacheManager},
    config,
    domain::{Checksum, PathSet, RequestContext, ThemeId},
    infra::{
        compressors::PassthroughCompressor,
        error::InfraError,
        fs::FsResourceProvider,
        telemetry,
        theme::{NoopThemeProcessor, TokenThemeProcessor},
    },
};
use tracing::{Dispatch, Level, debug, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Resolve(args) => run_resolve(&settings, *args),
    }
}

fn run_resolve(settings: &config::Settings, args: config::ResolveArgs) -> Result<(), AppError> {
    let paths: PathSet = args.paths.iter().map(String::as_str).collect();
    if paths.is_empty() {
        return Err(AppError::validation("at least one path is required"));
    }
    let ctx = args
        .theme
        .as_deref()
        .map(RequestContext::with_theme)
        .unwrap_or_default();

    let aggregator = build_aggregator(settings, &ctx.theme)?;

    let checksum = aggregator.resolve(&paths, args.kind, &ctx);
    println!("{checksum}");

    if let Some(directory) = args.output.as_deref() {
        write_artifact(&aggregator, &checksum, directory)?;
    }

    if args.report {
        for report in aggregator.cache_report() {
            println!(
                "{:<24} entries={:<6} bytes={}",
                report.name, report.entries, report.approximate_bytes
            );
        }
    }

    Ok(())
}

fn build_aggregator(settings: &config::Settings, theme: &ThemeId) -> Result<Aggregator, AppError> {
    let root = &settings.resources.root;
    if !root.is_dir() {
        return Err(AppError::from(InfraError::configuration(format!(
            "resources root `{}` is not a directory",
            root.display()
        ))));
    }

    // Without a token table the requested theme has nothing to substitute.
    let themes: Arc<dyn ThemeProcessor> = if settings.themes.contains_key(theme.as_str()) {
        let tables: HashMap<ThemeId, HashMap<String, String>> = settings
            .themes
            .iter()
            .map(|(theme, tokens)| (ThemeId::new(theme.as_str()), tokens.clone()))
            .collect();
        Arc::new(TokenThemeProcessor::new(tables))
    } else {
        debug!(theme = %theme, "No token table for theme; stylesheets stay unthemed");
        Arc::new(NoopThemeProcessor)
    };

    let collaborators = Collaborators {
        resources: Arc::new(FsResourceProvider::new(root.clone())),
        script_compressor: Arc::new(PassthroughCompressor),
        stylesheet_compressor: Arc::new(PassthroughCompressor),
        themes,
    };

    let caches = Arc::new(CacheManager::new(CacheConfig::from(&settings.cache)));
    Aggregator::new(AggregationConfig::from(settings), caches, collaborators)
        .map_err(AppError::from)
}

fn write_artifact(
    aggregator: &Aggregator,
    checksum: &Checksum,
    directory: &Path,
) -> Result<(), AppError> {
    let artifact = aggregator
        .fetch_artifact(checksum)
        .ok_or_else(|| AppError::unexpected(format!("artifact `{checksum}` was not retained")))?;

    fs::create_dir_all(directory).map_err(|err| AppError::from(InfraError::from(err)))?;
    let target = directory.join(checksum.as_str());
    fs::write(&target, artifact.content.as_bytes())
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        path = %target.display(),
        content_type = %artifact.content_type(),
        bytes = artifact.content.len(),
        "Wrote aggregate artifact"
    );
    Ok(())
}
