//! PDF Annotator Web - Web form for stamping names onto PDF pages.

mod app;
mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use clap::Parser;
use pdf_annotator_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pdf-annotator-web")]
#[command(author, version, about = "PDF Annotator Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Config file (defaults to ~/.config/pdf-annotator/config.toml or ./config.toml)
    #[arg(short, long, env = "PDF_ANNOTATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Static files directory (defaults to ./static or crate's static dir)
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// TrueType font for the stamp (overrides the config file)
    #[arg(long, env = "STAMP_FONT")]
    font: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Load the config named on the command line, else search the default locations.
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load(),
    };

    if let Some(font) = &args.font {
        config.stamp.font_path = Some(font.clone());
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = load_config(&args)?;

    // Loads the stamp font - fails fast on a bad path
    let state = Arc::new(
        AppState::new(config).context("Failed to initialize application state")?,
    );

    let static_dir = app::resolve_static_dir(args.static_dir.as_deref());
    let app = app::router(state, &static_dir);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_verbosity_counts() {
        let args = Args::try_parse_from(["pdf-annotator-web"]).unwrap();
        assert_eq!(args.verbose, 0);
        let args = Args::try_parse_from(["pdf-annotator-web", "-vvv"]).unwrap();
        assert_eq!(args.verbose, 3);
    }

    #[test]
    fn test_font_flag_overrides_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "upload_limit_mb = 5").unwrap();

        let args = Args::try_parse_from([
            "pdf-annotator-web",
            "--config",
            file.path().to_str().unwrap(),
            "--font",
            "/fonts/stamp.ttf",
            "-vv",
        ])
        .unwrap();
        let config = load_config(&args).unwrap();

        assert_eq!(config.upload_limit_mb, 5);
        assert_eq!(config.stamp.font_path, Some(PathBuf::from("/fonts/stamp.ttf")));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let args =
            Args::try_parse_from(["pdf-annotator-web", "-c", "/nonexistent/config.toml"]).unwrap();
        assert!(load_config(&args).is_err());
    }
}
