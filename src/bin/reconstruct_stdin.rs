//! Rebuild a saved page read from stdin and print the replica HTML.
//!
//! Usage: `reconstruct_stdin URL [CONTENT_TYPE] < page.html`
//!
//! The charset is taken from the optional `Content-Type` value, then from
//! the page itself. Metadata goes to stderr as JSON when `PAGE_REPLICA_META`
//! is set.

use std::env;
use std::error::Error;
use std::io::{self, Read, Write};

use page_replica::{reconstruct_bytes, Options};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut args = env::args().skip(1);
    let Some(url) = args.next() else {
        return Err("usage: reconstruct_stdin URL [CONTENT_TYPE] < page.html".into());
    };
    let content_type = args.next();

    let mut html = Vec::new();
    io::stdin().read_to_end(&mut html)?;

    let replica = reconstruct_bytes(&html, content_type.as_deref(), &url, &Options::default())?;

    if env::var_os("PAGE_REPLICA_META").is_some() {
        eprintln!("{}", serde_json::to_string_pretty(&replica.metadata)?);
    }

    let mut stdout = io::stdout().lock();
    stdout.write_all(replica.html.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
