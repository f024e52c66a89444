//! Metadata structs shared by the Machine types, lists and watch events
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, ObjectMeta, Time};
use serde::{Deserialize, Serialize};

/// `apiVersion` and `kind`, flattened into every object on the wire
#[derive(Deserialize, Serialize, Clone, Default, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// e.g. `machine.sapcloud.io/v1alpha1`
    pub api_version: String,

    /// e.g. `Machine`
    pub kind: String,
}

impl TypeMeta {
    /// Type information for a resource implementing [`Resource`](crate::Resource)
    pub fn resource<K: crate::Resource>() -> Self {
        Self {
            api_version: K::api_version().into_owned(),
            kind: K::kind().into_owned(),
        }
    }

    /// Type information for the list wrapper of a resource
    pub fn list<K: crate::Resource>() -> Self {
        Self {
            api_version: K::api_version().into_owned(),
            kind: format!("{}List", K::kind()),
        }
    }
}
