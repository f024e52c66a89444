//! Types and client-less behavior for the `machine.sapcloud.io` API group
//!
//! This crate holds the `Machine` resource, request parameters and the
//! [`Request`] builder that turns typed calls into `http::Request` objects.
//! The same items are re-exported from `machine-client` under `machine_client::core`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod machine;
pub use machine::{Machine, MachineList, MachineSpec, MachineStatus};

pub mod metadata;

pub mod object;
pub use object::ObjectList;

pub mod params;

pub mod request;
pub use request::Request;

mod resource;
pub use resource::{Resource, ResourceExt};

pub mod response;

pub mod watch;
pub use watch::WatchEvent;

mod error;
pub use error::ErrorResponse;
