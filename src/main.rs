use anyhow::{bail, Context};
use bc_admin_provider::config::cli::{CliArgs, Command};
use bc_admin_provider::utils::{logger, validation::Validate};
use bc_admin_provider::{
    AuthProvider, DataProvider, DryRunBackend, FileStore, ProviderConfig, ProviderError,
};
use clap::Parser;
use serde_json::{json, Value};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let config = load_config(&args)?;

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    tracing::info!("✅ Configuration loaded for wrapper '{}'", config.backend.wrapper_name);

    match args.command {
        Command::Data {
            kind,
            resource,
            params,
        } => run_data(config, &kind, &resource, &params).await,
        Command::Auth {
            kind,
            params,
            authenticated,
        } => run_auth(config, &kind, &params, authenticated).await,
    }
}

fn load_config(args: &CliArgs) -> anyhow::Result<ProviderConfig> {
    if Path::new(&args.config).exists() {
        tracing::info!("📁 Loading configuration from: {}", args.config);
        let mut config = ProviderConfig::from_file(&args.config)
            .with_context(|| format!("failed to load config file '{}'", args.config))?;
        if let Some(wrapper_name) = &args.wrapper_name {
            config.backend.wrapper_name = wrapper_name.clone();
        }
        return Ok(config);
    }

    match &args.wrapper_name {
        Some(wrapper_name) => {
            tracing::info!("📁 No config file at {}, using defaults", args.config);
            Ok(ProviderConfig::new(wrapper_name.clone()))
        }
        None => bail!(
            "config file '{}' not found; pass --config or --wrapper-name",
            args.config
        ),
    }
}

async fn run_data(
    config: ProviderConfig,
    kind: &str,
    resource: &str,
    params: &str,
) -> anyhow::Result<()> {
    let params: Value = serde_json::from_str(params).context("--params must be valid JSON")?;

    let backend = DryRunBackend::new();
    let provider = DataProvider::new(backend.clone(), config);
    let outcome = provider.execute(kind, resource, params).await;

    print_calls(&backend)?;
    match outcome {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => fail(e),
    }
}

async fn run_auth(
    config: ProviderConfig,
    kind: &str,
    params: &str,
    authenticated: bool,
) -> anyhow::Result<()> {
    let params: Value = serde_json::from_str(params).context("--params must be valid JSON")?;

    let store = FileStore::new(config.storage_path());
    let backend = DryRunBackend::new().with_authenticated(authenticated);
    let mut provider = AuthProvider::new(backend.clone(), store, config);
    let outcome = provider.execute(kind, params).await;

    print_calls(&backend)?;
    match outcome {
        Ok(permission) => {
            let summary = json!({
                "loggedIn": provider.session().logged_in,
                "permission": permission.or_else(|| provider.session().permission.clone()),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => fail(e),
    }
}

fn print_calls(backend: &DryRunBackend) -> anyhow::Result<()> {
    for call in backend.calls() {
        tracing::info!("🔍 backend call {}", call.operation);
        println!("{}", serde_json::to_string_pretty(&call)?);
    }
    Ok(())
}

fn fail(e: ProviderError) -> anyhow::Result<()> {
    tracing::error!("❌ Request failed: {}", e);
    eprintln!("❌ {}", e);
    println!("{}", serde_json::to_string_pretty(&e.rejection())?);
    std::process::exit(2);
}
