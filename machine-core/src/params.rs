//! Options for each verb and their query string encoding
//!
//! These mirror the apimachinery `GetOptions`, `ListOptions`, `CreateOptions`,
//! `UpdateOptions`, `PatchOptions` and `DeleteOptions`.
use std::fmt::Display;

use crate::request::Error;
use serde::{Serialize, Serializer};

pub(crate) type Query = form_urlencoded::Serializer<'static, String>;

// The only dry run stage the apiserver knows.
const ALL_STAGES: &str = "All";

fn pair(qp: &mut Query, key: &str, value: Option<impl Display>) {
    if let Some(value) = value {
        qp.append_pair(key, &value.to_string());
    }
}

fn flag(qp: &mut Query, key: &str, set: bool) {
    pair(qp, key, set.then_some(true));
}

/// How `resourceVersion` is interpreted on list calls
///
/// See <https://kubernetes.io/docs/reference/using-api/api-concepts/#semantics-for-get-and-list>.
#[derive(Clone, Debug, PartialEq)]
pub enum VersionMatch {
    /// Serve data at least as new as the given version
    ///
    /// Combined with version `"0"` this allows the apiserver to answer from its watch cache.
    NotOlderThan,
    /// Serve data at exactly the given version, or fail with `410 Gone`
    Exact,
}

impl VersionMatch {
    /// Query string value
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotOlderThan => "NotOlderThan",
            Self::Exact => "Exact",
        }
    }
}

/// Options for list and deletecollection calls
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListParams {
    /// Label selector, e.g. `name=worker-z1`
    pub label_selector: Option<String>,

    /// Field selector, e.g. `metadata.name=worker-z1-abcde`
    pub field_selector: Option<String>,

    /// Server side timeout of the call in seconds
    pub timeout: Option<u32>,

    /// Page size
    ///
    /// The server returns a continue token in the list metadata when more items remain.
    pub limit: Option<u32>,

    /// Token from a previous page
    pub continue_token: Option<String>,

    /// Matching strategy for `resource_version`
    pub version_match: Option<VersionMatch>,

    /// Explicit resourceVersion to list at
    pub resource_version: Option<String>,
}

impl ListParams {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        match (&self.resource_version, &self.version_match) {
            (Some(rv), Some(VersionMatch::Exact)) if rv == "0" => Err(Error::Validation(
                "ListParams::version_match Exact requires a non-zero resource_version".into(),
            )),
            (None, Some(_)) => Err(Error::Validation(
                "ListParams::version_match requires a resource_version".into(),
            )),
            // a continue token already pins the version
            (Some(_), _) if self.continue_token.is_some() => Err(Error::Validation(
                "ListParams::continue_token cannot be combined with a resource_version".into(),
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn populate_qp(&self, qp: &mut Query) {
        pair(qp, "fieldSelector", self.field_selector.as_deref());
        pair(qp, "labelSelector", self.label_selector.as_deref());
        pair(qp, "timeoutSeconds", self.timeout);
        pair(qp, "limit", self.limit);
        pair(qp, "continue", self.continue_token.as_deref());
        pair(qp, "resourceVersion", self.resource_version.as_deref());
        pair(qp, "resourceVersionMatch", self.version_match.as_ref().map(VersionMatch::as_str));
    }
}

/// Builders for [`ListParams`]
///
/// ```
/// use machine_core::params::ListParams;
/// let lp = ListParams::default()
///     .labels("name=worker-z1")
///     .limit(50);
/// ```
impl ListParams {
    /// Set the server side timeout in seconds
    #[must_use]
    pub fn timeout(self, timeout_secs: u32) -> Self {
        Self { timeout: Some(timeout_secs), ..self }
    }

    /// Restrict by field selector, e.g. `status.phase!=Running`
    #[must_use]
    pub fn fields(self, field_selector: &str) -> Self {
        Self { field_selector: Some(field_selector.to_string()), ..self }
    }

    /// Restrict by label selector, e.g. `key1=value1,key2!=value2`
    #[must_use]
    pub fn labels(self, label_selector: &str) -> Self {
        Self { label_selector: Some(label_selector.to_string()), ..self }
    }

    /// Page size
    #[must_use]
    pub fn limit(self, limit: u32) -> Self {
        Self { limit: Some(limit), ..self }
    }

    /// Continue from a previous page
    #[must_use]
    pub fn continue_token(self, token: &str) -> Self {
        Self { continue_token: Some(token.to_string()), ..self }
    }

    /// List at a resource version
    #[must_use]
    pub fn at(self, resource_version: &str) -> Self {
        Self { resource_version: Some(resource_version.into()), ..self }
    }

    /// Set the version match strategy; requires [`ListParams::at`]
    #[must_use]
    pub fn matching(self, version_match: VersionMatch) -> Self {
        Self { version_match: Some(version_match), ..self }
    }

    /// Accept any version, allowing the apiserver to serve from cache
    #[must_use]
    pub fn match_any(self) -> Self {
        self.matching(VersionMatch::NotOlderThan).at("0")
    }
}

/// Options for get calls
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetParams {
    /// Version to read at; unset reads the latest, `"0"` reads any cached version
    pub resource_version: Option<String>,
}

impl GetParams {
    /// Read at least at the given version
    #[must_use]
    pub fn at(resource_version: &str) -> Self {
        Self {
            resource_version: Some(resource_version.into()),
        }
    }

    /// Read any version, "0"
    #[must_use]
    pub fn any() -> Self {
        Self::at("0")
    }

    pub(crate) fn populate_qp(&self, qp: &mut Query) {
        pair(qp, "resourceVersion", self.resource_version.as_deref());
    }
}

/// Server side handling of unknown or duplicate fields on writes
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationDirective {
    /// Reject the request
    Strict,
    /// Accept the request and return warnings
    Warn,
    /// Drop the offending fields silently
    Ignore,
}

impl ValidationDirective {
    /// Query string value
    pub fn as_str(&self) -> &str {
        match self {
            Self::Strict => "Strict",
            Self::Warn => "Warn",
            Self::Ignore => "Ignore",
        }
    }
}

/// Options for watch calls
///
/// A watch always carries `watch=true`; these only narrow it.
#[derive(Clone, Debug, PartialEq)]
pub struct WatchParams {
    /// Label selector
    pub label_selector: Option<String>,

    /// Field selector
    pub field_selector: Option<String>,

    /// Server side timeout in seconds, 290 when unset
    ///
    /// Must stay below 295s, the apiserver's own ceiling for idle watch connections.
    pub timeout: Option<u32>,

    /// Ask for BOOKMARK events
    pub bookmarks: bool,

    /// Start the stream with synthetic ADDED events for the current state
    ///
    /// Requires `bookmarks`; the end of the initial state is marked by a bookmark
    /// annotated with `k8s.io/initial-events-end`.
    pub send_initial_events: bool,
}

impl Default for WatchParams {
    fn default() -> Self {
        Self {
            label_selector: None,
            field_selector: None,
            timeout: None,
            bookmarks: true,
            send_initial_events: false,
        }
    }
}

impl WatchParams {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(to) = &self.timeout {
            if *to >= 295 {
                return Err(Error::Validation("WatchParams::timeout must be < 295s".into()));
            }
        }
        if self.send_initial_events && !self.bookmarks {
            return Err(Error::Validation(
                "WatchParams::send_initial_events requires bookmarks".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn populate_qp(&self, qp: &mut Query) {
        flag(qp, "watch", true);
        pair(qp, "timeoutSeconds", Some(self.timeout.unwrap_or(290)));
        pair(qp, "fieldSelector", self.field_selector.as_deref());
        pair(qp, "labelSelector", self.label_selector.as_deref());
        flag(qp, "allowWatchBookmarks", self.bookmarks);
        flag(qp, "sendInitialEvents", self.send_initial_events);
        // initial events are only served with this match
        let initial_match = self.send_initial_events.then_some(VersionMatch::NotOlderThan);
        pair(qp, "resourceVersionMatch", initial_match.as_ref().map(VersionMatch::as_str));
    }

    /// Set the server side timeout in seconds
    #[must_use]
    pub fn timeout(self, timeout_secs: u32) -> Self {
        Self { timeout: Some(timeout_secs), ..self }
    }

    /// Restrict by field selector
    #[must_use]
    pub fn fields(self, field_selector: &str) -> Self {
        Self { field_selector: Some(field_selector.to_string()), ..self }
    }

    /// Restrict by label selector
    #[must_use]
    pub fn labels(self, label_selector: &str) -> Self {
        Self { label_selector: Some(label_selector.to_string()), ..self }
    }

    /// Do not ask for BOOKMARK events
    #[must_use]
    pub fn disable_bookmarks(self) -> Self {
        Self { bookmarks: false, ..self }
    }

    /// Begin the stream with the current state
    #[must_use]
    pub fn initial_events(self) -> Self {
        Self { send_initial_events: true, ..self }
    }
}

/// Options for create, update and replace calls
#[derive(Default, Clone, Debug, PartialEq)]
pub struct PostParams {
    /// Validate and admit the request without persisting it
    pub dry_run: bool,
    /// Name of the actor making the change, at most 128 characters
    pub field_manager: Option<String>,
}

impl PostParams {
    pub(crate) fn populate_qp(&self, qp: &mut Query) {
        pair(qp, "dryRun", self.dry_run.then_some(ALL_STAGES));
        pair(qp, "fieldManager", self.field_manager.as_deref());
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        validate_field_manager(self.field_manager.as_deref(), "PostParams")
    }
}

fn validate_field_manager(field_manager: Option<&str>, owner: &str) -> Result<(), Error> {
    match field_manager {
        Some(fm) if fm.len() > 128 => Err(Error::Validation(format!(
            "{owner}::field_manager must be at most 128 characters"
        ))),
        _ => Ok(()),
    }
}

/// A patch document together with its strategy
///
/// The strategy selects the request `Content-Type`.
///
/// ```
/// use machine_core::params::Patch;
/// let patch = serde_json::json!({
///     "metadata": { "labels": { "node.gardener.cloud/pool": "worker-z1" } }
/// });
/// let patch = Patch::Merge(&patch);
/// ```
#[non_exhaustive]
#[derive(Debug, PartialEq, Clone)]
pub enum Patch<T: Serialize> {
    /// Server side apply; requires a field manager
    Apply(T),

    /// RFC 6902 JSON patch
    ///
    /// `T` is unused here and must be named explicitly, e.g. `Patch::Json::<()>(p)`.
    #[cfg(feature = "jsonpatch")]
    #[cfg_attr(docsrs, doc(cfg(feature = "jsonpatch")))]
    Json(json_patch::Patch),

    /// RFC 7386 JSON merge patch
    Merge(T),

    /// Kubernetes strategic merge patch
    Strategic(T),
}

impl<T: Serialize> Patch<T> {
    pub(crate) fn is_apply(&self) -> bool {
        matches!(self, Patch::Apply(_))
    }

    /// `Content-Type` header for this patch strategy
    pub fn content_type(&self) -> &'static str {
        match &self {
            Self::Apply(_) => "application/apply-patch+yaml",
            #[cfg(feature = "jsonpatch")]
            Self::Json(_) => "application/json-patch+json",
            Self::Merge(_) => "application/merge-patch+json",
            Self::Strategic(_) => "application/strategic-merge-patch+json",
        }
    }

    pub(crate) fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Apply(p) | Self::Merge(p) | Self::Strategic(p) => serde_json::to_vec(p),
            #[cfg(feature = "jsonpatch")]
            Self::Json(p) => serde_json::to_vec(p),
        }
    }
}

/// Options for patch calls
#[derive(Default, Clone, Debug)]
pub struct PatchParams {
    /// Validate and admit the request without persisting it
    pub dry_run: bool,
    /// Take ownership of conflicting fields; only valid with [`Patch::Apply`]
    pub force: bool,
    /// Name of the actor making the change; required for [`Patch::Apply`]
    pub field_manager: Option<String>,
    /// Handling of unknown or duplicate fields
    pub field_validation: Option<ValidationDirective>,
}

impl PatchParams {
    pub(crate) fn validate<P: Serialize>(&self, patch: &Patch<P>) -> Result<(), Error> {
        validate_field_manager(self.field_manager.as_deref(), "PatchParams")?;
        if self.force && !patch.is_apply() {
            return Err(Error::Validation(
                "PatchParams::force only works with Patch::Apply".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn populate_qp(&self, qp: &mut Query) {
        pair(qp, "dryRun", self.dry_run.then_some(ALL_STAGES));
        flag(qp, "force", self.force);
        pair(qp, "fieldManager", self.field_manager.as_deref());
        pair(qp, "fieldValidation", self.field_validation.as_ref().map(ValidationDirective::as_str));
    }

    /// Params for server side apply as `manager`
    #[must_use]
    pub fn apply(manager: &str) -> Self {
        Self {
            field_manager: Some(manager.into()),
            ..Self::default()
        }
    }

    /// Force through conflicts on apply
    #[must_use]
    pub fn force(self) -> Self {
        Self { force: true, ..self }
    }

    /// Do not persist
    #[must_use]
    pub fn dry_run(self) -> Self {
        Self { dry_run: true, ..self }
    }

    /// Set the field validation directive
    #[must_use]
    pub fn validation(self, vd: ValidationDirective) -> Self {
        Self { field_validation: Some(vd), ..self }
    }
}

/// Options for delete and deletecollection calls
///
/// Sent as the JSON request body, not the query string.
#[derive(Default, Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    /// Do not persist; encoded as `"dryRun": ["All"]`
    #[serde(serialize_with = "all_stages", skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,

    /// Seconds before the object is removed; 0 deletes immediately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<u32>,

    /// Garbage collection of dependents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_policy: Option<PropagationPolicy>,

    /// Conditions that must hold, else `409 Conflict`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Preconditions>,
}

impl DeleteParams {
    /// Delete dependents in the background
    pub fn background() -> Self {
        Self {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Self::default()
        }
    }

    /// Delete dependents before the owner
    pub fn foreground() -> Self {
        Self {
            propagation_policy: Some(PropagationPolicy::Foreground),
            ..Self::default()
        }
    }

    /// Leave dependents behind
    pub fn orphan() -> Self {
        Self {
            propagation_policy: Some(PropagationPolicy::Orphan),
            ..Self::default()
        }
    }

    /// Do not persist
    #[must_use]
    pub fn dry_run(self) -> Self {
        Self { dry_run: true, ..self }
    }

    /// Set the grace period in seconds
    #[must_use]
    pub fn grace_period(self, secs: u32) -> Self {
        Self { grace_period_seconds: Some(secs), ..self }
    }

    /// Set delete preconditions
    #[must_use]
    pub fn preconditions(self, preconditions: Preconditions) -> Self {
        Self { preconditions: Some(preconditions), ..self }
    }
}

// In a body, dryRun is a list of stages.
fn all_stages<S: Serializer>(_: &bool, s: S) -> Result<S::Ok, S::Error> {
    [ALL_STAGES].serialize(s)
}

/// Conditions checked by the apiserver before deleting
#[derive(Default, Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preconditions {
    /// Expected resourceVersion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Expected uid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Garbage collection policy for dependents
#[derive(Clone, Debug, Serialize, PartialEq)]
pub enum PropagationPolicy {
    /// Keep dependents
    Orphan,
    /// Delete dependents after the owner
    Background,
    /// Delete dependents before the owner
    Foreground,
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(f: impl FnOnce(&mut Query)) -> String {
        let mut qp = Query::new(String::new());
        f(&mut qp);
        qp.finish()
    }

    #[test]
    fn delete_params_body() {
        let dp = DeleteParams::default();
        assert_eq!(serde_json::to_string(&dp).unwrap(), "{}");

        let dp = DeleteParams::foreground().dry_run().grace_period(0);
        assert_eq!(
            serde_json::to_value(&dp).unwrap(),
            serde_json::json!({"dryRun": ["All"], "gracePeriodSeconds": 0, "propagationPolicy": "Foreground"})
        );

        let dp = DeleteParams::orphan().preconditions(Preconditions {
            uid: Some("8d0e5b0c".into()),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(&dp).unwrap(),
            serde_json::json!({"propagationPolicy": "Orphan", "preconditions": {"uid": "8d0e5b0c"}})
        );
    }

    #[test]
    fn list_params_continue_excludes_version() {
        let lp = ListParams::default().continue_token("abc").limit(10);
        assert!(lp.validate().is_ok());
        assert_eq!(encode(|qp| lp.populate_qp(qp)), "limit=10&continue=abc");
        assert!(lp.at("100").validate().is_err());
    }

    #[test]
    fn list_params_any_version() {
        let lp = ListParams::default().match_any();
        assert!(lp.validate().is_ok());
        assert_eq!(
            encode(|qp| lp.populate_qp(qp)),
            "resourceVersion=0&resourceVersionMatch=NotOlderThan"
        );
        // kept with a limit too, the apiserver decides how to page
        let lp = ListParams::default().at("0").limit(5);
        assert_eq!(encode(|qp| lp.populate_qp(qp)), "limit=5&resourceVersion=0");
    }

    #[test]
    fn list_params_validation() {
        assert!(ListParams::default().matching(VersionMatch::Exact).validate().is_err());
        assert!(ListParams::default()
            .matching(VersionMatch::Exact)
            .at("0")
            .validate()
            .is_err());
        assert!(ListParams::default()
            .matching(VersionMatch::Exact)
            .at("42")
            .validate()
            .is_ok());
    }

    #[test]
    fn watch_params_validation() {
        assert!(WatchParams::default().timeout(295).validate().is_err());
        assert!(WatchParams::default().timeout(294).validate().is_ok());
        assert!(WatchParams::default()
            .disable_bookmarks()
            .initial_events()
            .validate()
            .is_err());
    }

    #[test]
    fn patch_params_field_validation() {
        let pp = PatchParams::default().validation(ValidationDirective::Strict);
        assert_eq!(encode(|qp| pp.populate_qp(qp)), "fieldValidation=Strict");
        let pp = PatchParams::apply("mcm").force().dry_run();
        assert_eq!(
            encode(|qp| pp.populate_qp(qp)),
            "dryRun=All&force=true&fieldManager=mcm"
        );
    }

    #[test]
    fn field_manager_length_is_bounded() {
        let pp = PostParams {
            field_manager: Some("m".repeat(129)),
            ..Default::default()
        };
        assert!(pp.validate().is_err());
        let pp = PatchParams::apply(&"m".repeat(128));
        assert!(pp.validate(&Patch::Apply(())).is_ok());
    }

    #[test]
    fn force_requires_apply() {
        let pp = PatchParams::default().force();
        assert!(pp.validate(&Patch::Merge(())).is_err());
        assert!(pp.validate(&Patch::Apply(())).is_ok());
    }
}
