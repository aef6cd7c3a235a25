//! Render one URL through headless Chrome and write its replica.
//!
//! Usage: `extract_page URL SLUG [OUT_DIR]`
//!
//! `PAGE_REPLICA_CONFIG` may point at a JSON file overriding any subset of
//! `Options`. Logging follows `RUST_LOG`.

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use page_replica::{extract_with_options, Options};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn load_options() -> Result<Options, Box<dyn Error>> {
    match env::var_os("PAGE_REPLICA_CONFIG") {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .map_err(|e| format!("cannot read config {}: {e}", PathBuf::from(&path).display()))?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(Options::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,page_replica=debug,chromiumoxide=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = env::args().skip(1);
    let (Some(url), Some(slug)) = (args.next(), args.next()) else {
        return Err("usage: extract_page URL SLUG [OUT_DIR]".into());
    };

    let mut options = load_options()?;
    if let Some(out_dir) = args.next() {
        options.output_dir = PathBuf::from(out_dir);
    }

    let html_path = extract_with_options(&url, &slug, &options).await?;
    println!("{}", html_path.display());
    Ok(())
}
