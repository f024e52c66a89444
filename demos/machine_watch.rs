//! Follow machine changes, resuming from the last seen resourceVersion.
//!
//! The apiserver closes watches after `timeoutSeconds`; the loop re-issues the
//! watch, and relists when the version it resumes from has expired.
use clap::Parser;
use futures::{StreamExt, TryStreamExt};
use machine_client::{
    api::{ListParams, ResourceExt, WatchEvent, WatchParams},
    Client, Machines,
};
use tracing::*;

#[derive(Parser)]
struct App {
    /// Namespace to watch, defaults to the namespace of the current context
    #[arg(long, short)]
    namespace: Option<String>,
    /// Label selector, e.g. `name=worker-z1`
    #[arg(long, short = 'l')]
    selector: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let app = App::parse();
    let client = Client::try_default().await?;
    let machines = match &app.namespace {
        Some(ns) => Machines::namespaced(client, ns),
        None => Machines::default_namespaced(client),
    };

    let mut wp = WatchParams::default();
    let mut lp = ListParams::default();
    if let Some(selector) = &app.selector {
        wp = wp.labels(selector);
        lp = lp.labels(selector);
    }

    let mut version = current_version(&machines, &lp).await?;
    loop {
        info!("Watching from resourceVersion {version}");
        let from = version.clone();
        let mut stream = machines.watch(&wp, &from).await?.boxed();
        while let Some(event) = stream.try_next().await? {
            match event {
                WatchEvent::Added(m) | WatchEvent::Modified(m) => {
                    let phase = m.phase().map(ToString::to_string).unwrap_or_default();
                    info!("Applied {} ({phase})", m.name_any());
                    version = m.resource_version().unwrap_or(version);
                }
                WatchEvent::Deleted(m) => {
                    info!("Deleted {}", m.name_any());
                    version = m.resource_version().unwrap_or(version);
                }
                WatchEvent::Bookmark(b) => version = b.metadata.resource_version,
                WatchEvent::Error(e) if e.code == 410 => {
                    warn!("Watch expired: {}", e.message);
                    version = current_version(&machines, &lp).await?;
                    break;
                }
                WatchEvent::Error(e) => return Err(e.into()),
            }
        }
    }
}

async fn current_version(machines: &Machines, lp: &ListParams) -> anyhow::Result<String> {
    let list = machines.list(&lp.clone().limit(1)).await?;
    Ok(list.metadata.resource_version.unwrap_or_else(|| "0".into()))
}
