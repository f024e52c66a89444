//! List machines page by page, optionally filtered by a label selector.
use clap::Parser;
use machine_client::{
    api::{ListParams, ResourceExt},
    Client, Machines,
};
use tracing::*;

#[derive(Parser)]
struct App {
    /// Namespace to list in, defaults to the namespace of the current context
    #[arg(long, short)]
    namespace: Option<String>,
    /// List across all namespaces
    #[arg(long, short = 'A')]
    all: bool,
    /// Label selector, e.g. `name=worker-z1`
    #[arg(long, short = 'l')]
    selector: Option<String>,
    /// Page size
    #[arg(long, default_value_t = 50)]
    limit: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let app = App::parse();
    let client = Client::try_default().await?;
    let machines = match (&app.namespace, app.all) {
        (_, true) => Machines::all(client),
        (Some(ns), false) => Machines::namespaced(client, ns),
        (None, false) => Machines::default_namespaced(client),
    };

    let mut lp = ListParams::default().limit(app.limit);
    if let Some(selector) = &app.selector {
        lp = lp.labels(selector);
    }

    println!("{0:<48} {1:<18} {2}", "NAME", "PHASE", "NODE");
    loop {
        let page = machines.list(&lp).await?;
        for m in page.iter() {
            let phase = m.phase().map(ToString::to_string).unwrap_or_default();
            let node = m.status.as_ref().and_then(|s| s.node.clone()).unwrap_or_default();
            println!("{0:<48} {1:<18} {2}", m.name_any(), phase, node);
        }
        match page.continue_token() {
            Some(token) => {
                debug!("Fetching next page");
                lp = lp.continue_token(token);
            }
            None => break,
        }
    }
    Ok(())
}
