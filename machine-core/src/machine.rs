//! The `Machine` resource of `machine.sapcloud.io/v1alpha1`
//!
//! A `Machine` is a request for one provider VM that is expected to join the
//! cluster as a node. Its `spec` references a machine class holding the provider
//! configuration; its `status` is written by the machine controller.
use crate::{
    metadata::{ObjectMeta, Time, TypeMeta},
    object::ObjectList,
    resource::Resource,
};
use k8s_openapi::api::core::v1::{NodeCondition, NodeSpec};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A `Machine` object
///
/// Decoding fails when the document carries type information of another kind
/// or API version, e.g. a `MachineList` or a `Status`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(try_from = "MachineFields")]
pub struct Machine {
    /// `apiVersion` and `kind`
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,

    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Desired state
    #[serde(default)]
    pub spec: MachineSpec,

    /// Observed state, owned by the machine controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MachineStatus>,
}

// Wire shape of a `Machine` before its type information is checked
#[derive(Deserialize)]
struct MachineFields {
    #[serde(flatten, default)]
    types: Option<TypeMeta>,
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: MachineSpec,
    #[serde(default)]
    status: Option<MachineStatus>,
}

impl TryFrom<MachineFields> for Machine {
    type Error = String;

    fn try_from(fields: MachineFields) -> Result<Self, Self::Error> {
        if let Some(types) = &fields.types {
            if types.kind != Self::kind() || types.api_version != Self::api_version() {
                return Err(format!(
                    "expected kind Machine of {}, found kind {:?} of {:?}",
                    Self::api_version(),
                    types.kind,
                    types.api_version
                ));
            }
        }
        Ok(Self {
            types: fields.types,
            metadata: fields.metadata,
            spec: fields.spec,
            status: fields.status,
        })
    }
}

/// List of machines as returned by list and deletecollection
pub type MachineList = ObjectList<Machine>;

impl Machine {
    /// A named machine with type information filled in
    pub fn new(name: &str, spec: MachineSpec) -> Self {
        Self {
            types: Some(TypeMeta::resource::<Machine>()),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            spec,
            status: None,
        }
    }

    /// Current phase reported by the controller, if any
    pub fn phase(&self) -> Option<&MachinePhase> {
        self.status.as_ref()?.current_status.as_ref().map(|s| &s.phase)
    }
}

impl Resource for Machine {
    fn kind() -> Cow<'static, str> {
        "Machine".into()
    }

    fn group() -> Cow<'static, str> {
        "machine.sapcloud.io".into()
    }

    fn version() -> Cow<'static, str> {
        "v1alpha1".into()
    }

    fn plural() -> Cow<'static, str> {
        "machines".into()
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Desired state of a [`Machine`]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// The machine class holding provider specific configuration
    #[serde(default)]
    pub class: ClassSpec,

    /// Id assigned by the infrastructure provider once the VM exists
    #[serde(rename = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Metadata and spec copied onto the node backed by this machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_template: Option<NodeTemplateSpec>,

    /// Per machine overrides of the controller timeouts
    #[serde(flatten)]
    pub configuration: MachineConfiguration,
}

/// Reference to a machine class
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassSpec {
    /// API group of the class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
    /// Kind of the class, usually `MachineClass`
    #[serde(default)]
    pub kind: String,
    /// Name of the class
    #[serde(default)]
    pub name: String,
}

/// Template applied to the node joining for a machine
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NodeTemplateSpec {
    /// Labels and annotations for the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    /// Taints and other node spec fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<NodeSpec>,
}

/// Timeouts and health settings overriding the controller defaults
///
/// Durations are kept in their Go duration notation, e.g. `"2h"` or `"10m0s"`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineConfiguration {
    /// How long to drain the node before deleting the VM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_timeout: Option<String>,
    /// How long an unhealthy machine is tolerated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_timeout: Option<String>,
    /// How long a machine may take to join
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timeout: Option<String>,
    /// How often eviction of a pod is retried during drain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_evict_retries: Option<i32>,
    /// Comma separated node condition types treated as unhealthy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_conditions: Option<String>,
}

/// Observed state of a [`Machine`]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    /// Name of the node backed by this machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    /// Conditions copied from the node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<NodeCondition>,

    /// Last operation performed by the controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    /// Current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<CurrentStatus>,

    /// Opaque provider state from the last successful operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_state: Option<String>,
}

/// The last operation performed on a machine
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Provider error code, when the operation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// When the operation was last updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,
    /// Outcome so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MachineState>,
    /// Which operation
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<MachineOperationType>,
}

/// Phase of a machine together with its timeout state
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus {
    /// Phase
    pub phase: MachinePhase,
    /// Whether the creation or health timeout is running
    #[serde(default)]
    pub timeout_active: bool,
    /// When the phase last changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,
}

// Enums round-trip values this crate does not know about through `Other`,
// so a newer controller cannot break decoding of the whole object.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A value not known to this client
            Other(String),
        }

        impl $name {
            /// Wire representation
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                    Self::Other(s) => s,
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $(stringify!($variant) => Self::$variant,)+
                    _ => Self::Other(s),
                }
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Lifecycle phase of a machine
    MachinePhase {
        /// VM requested, node not yet joined
        Pending,
        /// Machine is waiting to be adopted
        Available,
        /// Node joined and is healthy
        Running,
        /// Machine is being drained and deleted
        Terminating,
        /// Node stopped reporting healthy
        Unknown,
        /// Creation or health timeout expired
        Failed,
        /// Creation keeps failing and is backing off
        CrashLoopBackOff,
    }
}

string_enum! {
    /// Outcome of a [`LastOperation`]
    MachineState {
        /// Still running
        Processing,
        /// Did not succeed
        Failed,
        /// Completed
        Successful,
    }
}

string_enum! {
    /// Kind of a [`LastOperation`]
    MachineOperationType {
        /// VM creation
        Create,
        /// Spec update
        Update,
        /// Health check of the backing node
        HealthCheck,
        /// Drain and VM deletion
        Delete,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn new_machine_serializes_type_info() {
        let spec = MachineSpec {
            class: ClassSpec {
                api_group: Some("machine.sapcloud.io".into()),
                kind: "MachineClass".into(),
                name: "shoot--dev--worker-z1".into(),
            },
            configuration: MachineConfiguration {
                drain_timeout: Some("2h".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let m = Machine::new("worker-z1-abcde", spec);
        assert_json_eq!(
            serde_json::to_value(&m).unwrap(),
            json!({
                "apiVersion": "machine.sapcloud.io/v1alpha1",
                "kind": "Machine",
                "metadata": { "name": "worker-z1-abcde" },
                "spec": {
                    "class": { "apiGroup": "machine.sapcloud.io", "kind": "MachineClass", "name": "shoot--dev--worker-z1" },
                    "drainTimeout": "2h"
                }
            })
        );
    }

    #[test]
    fn decodes_status_from_controller() {
        let m: Machine = serde_yaml::from_str(
            r#"
apiVersion: machine.sapcloud.io/v1alpha1
kind: Machine
metadata:
  name: worker-z1-abcde
  namespace: shoot--dev
spec:
  class:
    kind: MachineClass
    name: shoot--dev--worker-z1
  providerID: aws:///eu-west-1/i-0123456789
status:
  node: ip-10-250-0-12.eu-west-1.compute.internal
  conditions:
  - type: Ready
    status: "True"
  currentStatus:
    phase: Running
    timeoutActive: false
    lastUpdateTime: "2024-05-01T10:00:00Z"
  lastOperation:
    description: Machine worker-z1-abcde successfully joined the cluster
    state: Successful
    type: Create
    lastUpdateTime: "2024-05-01T10:00:00Z"
"#,
        )
        .unwrap();
        assert_eq!(m.spec.provider_id.as_deref(), Some("aws:///eu-west-1/i-0123456789"));
        assert_eq!(m.phase(), Some(&MachinePhase::Running));
        let status = m.status.unwrap();
        assert_eq!(status.conditions[0].type_, "Ready");
        let op = status.last_operation.unwrap();
        assert_eq!(op.state, Some(MachineState::Successful));
        assert_eq!(op.type_, Some(MachineOperationType::Create));
    }

    #[test]
    fn other_kinds_do_not_decode_as_machine() {
        let list = json!({
            "apiVersion": "machine.sapcloud.io/v1alpha1",
            "kind": "MachineList",
            "metadata": { "resourceVersion": "5" },
            "items": [{ "metadata": { "name": "worker-a" } }]
        });
        let err = serde_json::from_value::<Machine>(list).unwrap_err();
        assert!(err.to_string().contains("MachineList"), "{err}");

        let older = json!({ "apiVersion": "machine.sapcloud.io/v1beta1", "kind": "Machine" });
        assert!(serde_json::from_value::<Machine>(older).is_err());

        // items of a list may come without type information
        let bare: Machine = serde_json::from_value(json!({ "metadata": { "name": "worker-a" } })).unwrap();
        assert_eq!(bare.metadata.name.as_deref(), Some("worker-a"));
        assert!(bare.types.is_none());
    }

    #[test]
    fn unknown_phase_is_preserved() {
        let status: CurrentStatus = serde_json::from_value(json!({"phase": "InPlaceUpdating"})).unwrap();
        assert_eq!(status.phase, MachinePhase::Other("InPlaceUpdating".into()));
        assert_eq!(status.phase.to_string(), "InPlaceUpdating");
        let back = serde_json::to_value(&status).unwrap();
        assert_eq!(back["phase"], "InPlaceUpdating");
    }
}
