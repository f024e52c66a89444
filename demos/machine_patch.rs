//! Label a machine, either with a merge patch or through server side apply.
use anyhow::bail;
use clap::Parser;
use machine_client::{
    api::{Patch, PatchParams, ResourceExt},
    Client, Machines,
};
use serde_json::json;
use tracing::*;

#[derive(Parser)]
struct App {
    /// Machine to patch
    name: String,
    /// Labels to set, as `key=value`
    #[arg(required = true)]
    labels: Vec<String>,
    /// Namespace of the machine, defaults to the namespace of the current context
    #[arg(long, short)]
    namespace: Option<String>,
    /// Use server side apply as this field manager instead of a merge patch
    #[arg(long)]
    apply: Option<String>,
    /// Validate the change without persisting it
    #[arg(long)]
    dry_run: bool,
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

    let mut labels = serde_json::Map::new();
    for pair in &app.labels {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("label {pair:?} is not of the form key=value");
        };
        labels.insert(key.to_string(), json!(value));
    }

    let mut pp = match &app.apply {
        Some(manager) => PatchParams::apply(manager),
        None => PatchParams::default(),
    };
    if app.dry_run {
        pp = pp.dry_run();
    }

    let machine = if app.apply.is_some() {
        let patch = json!({
            "apiVersion": "machine.sapcloud.io/v1alpha1",
            "kind": "Machine",
            "metadata": { "name": app.name, "labels": labels },
        });
        machines.patch(&app.name, &pp, &Patch::Apply(&patch)).await?
    } else {
        let patch = json!({ "metadata": { "labels": labels } });
        machines.patch(&app.name, &pp, &Patch::Merge(&patch)).await?
    };

    info!("Patched {} at resourceVersion {:?}", machine.name_any(), machine.resource_version());
    print!("{}", serde_yaml::to_string(machine.labels())?);
    Ok(())
}
