//! Typed client for the `machine.sapcloud.io/v1alpha1` `Machine` resource
//!
//! [`Machines`] exposes get, list, watch, create, update, delete, deletecollection
//! and patch against the `machines` collection. Each call builds one request with
//! [`machine_core::Request`], sends it through a [`Client`] and decodes the answer;
//! failures are handed back unchanged as [`Error`].
//!
//! ```no_run
//! use machine_client::{api::ListParams, Client, Machines};
//!
//! # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::try_default().await?;
//! let machines = Machines::namespaced(client, "shoot--dev--cluster");
//! for m in machines.list(&ListParams::default().labels("name=worker-z1")).await? {
//!     println!("{:?}", m.phase());
//! }
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub use machine_core as core;

pub mod api;
pub use api::{MachineClient, Machines, MachinesGetter};

pub mod client;
pub use client::Client;

pub mod config;
pub use config::Config;

pub mod error;
pub use error::Error;

/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
