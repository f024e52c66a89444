pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use std::{borrow::Cow, collections::BTreeMap};

/// Static type information about an API resource
///
/// Implementors are addressable under `/apis/{group}/{version}/[namespaces/{ns}/]{plural}`.
pub trait Resource {
    /// Kind, e.g. `Machine`
    fn kind() -> Cow<'static, str>;
    /// API group, e.g. `machine.sapcloud.io`
    fn group() -> Cow<'static, str>;
    /// API version inside the group, e.g. `v1alpha1`
    fn version() -> Cow<'static, str>;
    /// Lowercase plural used in urls, e.g. `machines`
    fn plural() -> Cow<'static, str>;

    /// `group/version`, or just `version` for the legacy core group
    fn api_version() -> Cow<'static, str> {
        let group = Self::group();
        if group.is_empty() {
            return Self::version();
        }
        format!("{}/{}", group, Self::version()).into()
    }

    /// Url path of the collection, optionally scoped to a namespace
    fn url_path(namespace: Option<&str>) -> String {
        let ns = namespace.map(|n| format!("namespaces/{n}/")).unwrap_or_default();
        let group = Self::group();
        let root = if group.is_empty() { "api" } else { "apis" };
        format!("/{root}/{}/{ns}{}", Self::api_version(), Self::plural())
    }

    /// Object metadata
    fn meta(&self) -> &ObjectMeta;
    /// Object metadata, mutably
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

/// Convenience accessors for [`Resource`] metadata
pub trait ResourceExt: Resource {
    /// The name, falling back to `generateName` for objects not yet persisted
    fn name_any(&self) -> String;
    /// The name, or `None` for objects relying on `generateName`
    fn name_unchecked(&self) -> Option<&str>;
    /// The namespace, if any
    fn namespace(&self) -> Option<String>;
    /// The resourceVersion, present on every object read from the apiserver
    fn resource_version(&self) -> Option<String>;
    /// The uid, present on every object read from the apiserver
    fn uid(&self) -> Option<String>;
    /// Time the object was marked for deletion
    fn deletion_timestamp(&self) -> Option<&Time>;
    /// Labels
    fn labels(&self) -> &BTreeMap<String, String>;
    /// Labels, mutably
    fn labels_mut(&mut self) -> &mut BTreeMap<String, String>;
    /// Annotations
    fn annotations(&self) -> &BTreeMap<String, String>;
    /// Annotations, mutably
    fn annotations_mut(&mut self) -> &mut BTreeMap<String, String>;
    /// Finalizers
    fn finalizers(&self) -> &[String];
    /// Finalizers, mutably
    fn finalizers_mut(&mut self) -> &mut Vec<String>;
}

static EMPTY_MAP: BTreeMap<String, String> = BTreeMap::new();

impl<K: Resource> ResourceExt for K {
    fn name_any(&self) -> String {
        let meta = self.meta();
        meta.name
            .clone()
            .or_else(|| meta.generate_name.clone())
            .unwrap_or_default()
    }

    fn name_unchecked(&self) -> Option<&str> {
        self.meta().name.as_deref()
    }

    fn namespace(&self) -> Option<String> {
        self.meta().namespace.clone()
    }

    fn resource_version(&self) -> Option<String> {
        self.meta().resource_version.clone()
    }

    fn uid(&self) -> Option<String> {
        self.meta().uid.clone()
    }

    fn deletion_timestamp(&self) -> Option<&Time> {
        self.meta().deletion_timestamp.as_ref()
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        self.meta().labels.as_ref().unwrap_or(&EMPTY_MAP)
    }

    fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.meta_mut().labels.get_or_insert_with(BTreeMap::new)
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        self.meta().annotations.as_ref().unwrap_or(&EMPTY_MAP)
    }

    fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.meta_mut().annotations.get_or_insert_with(BTreeMap::new)
    }

    fn finalizers(&self) -> &[String] {
        self.meta().finalizers.as_deref().unwrap_or_default()
    }

    fn finalizers_mut(&mut self) -> &mut Vec<String> {
        self.meta_mut().finalizers.get_or_insert_with(Vec::new)
    }
}
