use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::infra::config::Config;
use crate::infra::runtime::limits::{make_http_client, retry_async};
use crate::registry::CapabilityRegistry;
use crate::tools::registry::PluginCatalog;

#[derive(Parser)]
#[command(name = "capability-gateway")]
#[command(about = "Serve prompts, resources and tools from a configuration directory over MCP")]
#[command(version)]
pub struct Cli {
    /// Capability configuration directory (holds mcp-config.yaml)
    #[arg(short, long, global = true, env = "CONFIG_DIR")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway (stdio or HTTP, per MODE)
    Serve,
    /// Load the configuration directory and report what was registered
    Validate,
    /// List every loaded capability with its description
    Inspect,
    /// Health check a running HTTP gateway
    Health {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    run_commands(cli.config, cli.command.unwrap_or(Commands::Serve)).await
}

pub async fn run_commands(config: Option<PathBuf>, command: Commands) -> ExitCode {
    let cfg = match resolve_config(config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Settings error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    match command {
        Commands::Serve => match crate::infra::boot::run(cfg).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "gateway stopped");
                ExitCode::FAILURE
            }
        },
        Commands::Validate => match validate(&cfg).await {
            Ok(report) => {
                print!("{report}");
                println!("✅ Configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {e:#}");
                ExitCode::FAILURE
            }
        },
        Commands::Inspect => match inspect(&cfg).await {
            Ok(report) => {
                print!("{report}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Inspect failed: {e:#}");
                ExitCode::FAILURE
            }
        },
        Commands::Health { url } => match health_check(&url).await {
            Ok(_) => {
                println!("✅ Service is healthy");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Health check failed: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn resolve_config(config: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut cfg = Config::from_env_and_toml()?;
    if let Some(dir) = config {
        cfg.config_dir = dir;
    }
    Ok(cfg)
}

async fn load(cfg: &Config) -> anyhow::Result<CapabilityRegistry> {
    Ok(CapabilityRegistry::load(&cfg.config_dir, PluginCatalog::with_builtins(), cfg.exec_limits()).await?)
}

async fn validate(cfg: &Config) -> anyhow::Result<String> {
    let registry = load(cfg).await?;
    let mut out = String::new();
    if let Some(doc) = registry.document() {
        writeln!(out, "📦 {} {}", doc.name, doc.version)?;
    }
    writeln!(out, "  prompts:   {}", registry.prompts().len())?;
    writeln!(out, "  resources: {}", registry.resources().len())?;
    writeln!(out, "  tools:     {}", registry.tools().len())?;
    if !registry.warnings().is_empty() {
        writeln!(out, "⚠️  {} warning(s):", registry.warnings().len())?;
        for w in registry.warnings() {
            writeln!(out, "  - {w}")?;
        }
    }
    Ok(out)
}

async fn inspect(cfg: &Config) -> anyhow::Result<String> {
    let registry = load(cfg).await?;
    let mut out = String::new();
    for p in registry.prompts() {
        let state = if p.enabled() { "" } else { " (disabled)" };
        writeln!(out, "prompt   {}{}  {}", p.id, state, p.description().unwrap_or(""))?;
    }
    for r in registry.resources() {
        writeln!(out, "resource {}  {} ({} files)", r.id, r.description, r.files.len())?;
    }
    for t in registry.tools() {
        let kind = if t.is_external_process() { "script" } else { "module" };
        writeln!(out, "tool     {}  [{kind}] {}", t.id, t.description)?;
    }
    Ok(out)
}

async fn health_check(url: &str) -> anyhow::Result<()> {
    let client = make_http_client()?;
    let endpoint = format!("{}/healthz", url.trim_end_matches('/'));
    retry_async(2, |_| {
        let client = client.clone();
        let endpoint = endpoint.clone();
        async move {
            let response = client.get(&endpoint).send().await?;
            if response.status().is_success() {
                Ok::<(), anyhow::Error>(())
            } else {
                Err(anyhow::anyhow!("HTTP {}", response.status()))
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::Path;

    fn write(root: &Path, rel: &str, text: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, text).unwrap();
    }

    fn config_for(dir: &Path) -> Config {
        std::env::remove_var("GATEWAY_SETTINGS");
        resolve_config(Some(dir.to_path_buf())).unwrap()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "mcp-config.yaml",
            "name: cli\nversion: '1'\npaths:\n  prompts: prompts\n  resources: resources\n  tools: tools\n",
        );
        write(dir.path(), "prompts/a.md", "---\ndescription: First\n---\nA");
        write(dir.path(), "resources/docs/README.md", "# Docs");
        write(dir.path(), "resources/docs/x.txt", "x");
        write(dir.path(), "tools/echo.yaml", "name: echo\ndescription: Echo\nhandler: echo\nparameters: {}\n");
        write(dir.path(), "tools/bad.yaml", "name: bad\nhandler: nowhere\nparameters: {}\n");
        dir
    }

    #[tokio::test]
    #[serial]
    async fn validate_reports_counts_and_warnings() {
        let dir = fixture();
        let report = validate(&config_for(dir.path())).await.unwrap();
        assert!(report.contains("cli 1"));
        assert!(report.contains("prompts:   1"));
        assert!(report.contains("resources: 1"));
        assert!(report.contains("tools:     1"));
        assert!(report.contains("1 warning(s)"));
    }

    #[tokio::test]
    #[serial]
    async fn inspect_lists_each_capability() {
        let dir = fixture();
        let report = inspect(&config_for(dir.path())).await.unwrap();
        assert!(report.contains("prompt   a  First"));
        assert!(report.contains("resource docs  Docs (1 files)"));
        assert!(report.contains("tool     echo  [module] Echo"));
    }

    #[tokio::test]
    #[serial]
    async fn validate_fails_without_document() {
        let dir = tempfile::tempdir().unwrap();
        let code = run_commands(Some(dir.path().to_path_buf()), Commands::Validate).await;
        assert_eq!(code, ExitCode::FAILURE);

        let dir = fixture();
        let code = run_commands(Some(dir.path().to_path_buf()), Commands::Validate).await;
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[tokio::test]
    #[serial]
    async fn config_flag_overrides_env() {
        std::env::remove_var("GATEWAY_SETTINGS");
        std::env::set_var("CONFIG_DIR", "/from/env");
        let cfg = resolve_config(Some(PathBuf::from("/from/flag"))).unwrap();
        assert_eq!(cfg.config_dir, PathBuf::from("/from/flag"));
        let cfg = resolve_config(None).unwrap();
        assert_eq!(cfg.config_dir, PathBuf::from("/from/env"));
        std::env::remove_var("CONFIG_DIR");
    }

    #[tokio::test]
    async fn health_check_ok_and_error_paths() {
        use httpmock::prelude::*;
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/healthz");
            then.status(200).body("ok");
        });
        assert!(health_check(&server.base_url()).await.is_ok());

        let bad = MockServer::start();
        let mock = bad.mock(|when, then| {
            when.method(GET).path("/healthz");
            then.status(500);
        });
        assert!(health_check(&bad.base_url()).await.is_err());
        mock.assert_hits(3);
    }

    #[tokio::test]
    #[serial]
    async fn run_commands_health_success() {
        use httpmock::prelude::*;
        std::env::remove_var("GATEWAY_SETTINGS");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/healthz");
            then.status(200).body("ok");
        });
        let code = run_commands(None, Commands::Health { url: server.base_url() }).await;
        assert_eq!(code, ExitCode::SUCCESS);
    }
}
