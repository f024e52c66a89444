//! Request builder turning typed calls into `http::Request` objects
use crate::params::{DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams, Query, WatchParams};
use thiserror::Error;

pub(crate) const JSON_MIME: &str = "application/json";

/// Failure to construct a request
#[derive(Error, Debug)]
pub enum Error {
    /// Options are inconsistent with each other or with the verb
    #[error("failed to validate request: {0}")]
    Validation(String),
    /// `http` rejected the request parts
    #[error("failed to build request: {0}")]
    BuildRequest(#[source] http::Error),
    /// The body could not be serialized
    #[error("failed to serialize body: {0}")]
    SerializeBody(#[source] serde_json::Error),
}

/// Builds requests against one collection path
///
/// Every verb returns an `http::Request` with a JSON (or patch) body, ready to
/// be sent by any HTTP client.
#[derive(Debug, Clone)]
pub struct Request {
    /// Path of the collection, e.g. `/apis/machine.sapcloud.io/v1alpha1/machines`
    pub url_path: String,
}

impl Request {
    /// New builder for a collection path
    pub fn new<S: Into<String>>(url_path: S) -> Self {
        Self {
            url_path: url_path.into(),
        }
    }

    // Path of a named object, optionally below it a subresource of one or more segments.
    fn object_path(&self, name: &str, subresource: Option<&str>) -> Result<String, Error> {
        validate_name(name)?;
        match subresource {
            None => Ok(format!("{}/{}", self.url_path, name)),
            Some(sub) if sub.is_empty() || sub.split('/').any(str::is_empty) => Err(Error::Validation(
                format!("subresource {sub:?} must be a non-empty path"),
            )),
            Some(sub) => Ok(format!("{}/{}/{}", self.url_path, name, sub)),
        }
    }
}

/// Check that `name` addresses exactly one object below a collection path
///
/// An empty name would address the collection itself, and `/` or `%` would
/// leave the path segment. `.` and `..` are rejected by the apiserver's router.
pub fn validate_name(name: &str) -> Result<(), Error> {
    match name {
        "" => Err(Error::Validation("resource name may not be empty".into())),
        "." | ".." => Err(Error::Validation(format!("resource name may not be {name:?}"))),
        _ if name.contains(['/', '%']) => Err(Error::Validation(format!(
            "resource name {name:?} may not contain '/' or '%'"
        ))),
        _ => Ok(()),
    }
}

// Append a query string only when some parameter was set.
fn with_query(path: String, populate: impl FnOnce(&mut Query)) -> String {
    let mut qp = Query::new(String::new());
    populate(&mut qp);
    let query = qp.finish();
    if query.is_empty() {
        path
    } else {
        format!("{path}?{query}")
    }
}

fn json_body(method: http::Method, uri: String, body: Vec<u8>) -> Result<http::Request<Vec<u8>>, Error> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, JSON_MIME)
        .body(body)
        .map_err(Error::BuildRequest)
}

fn no_body(uri: String) -> Result<http::Request<Vec<u8>>, Error> {
    http::Request::get(uri).body(vec![]).map_err(Error::BuildRequest)
}

impl Request {
    /// List objects in the collection
    pub fn list(&self, lp: &ListParams) -> Result<http::Request<Vec<u8>>, Error> {
        lp.validate()?;
        no_body(with_query(self.url_path.clone(), |qp| lp.populate_qp(qp)))
    }

    /// Watch the collection from a resourceVersion
    ///
    /// The query always carries `watch=true`.
    pub fn watch(&self, wp: &WatchParams, ver: &str) -> Result<http::Request<Vec<u8>>, Error> {
        wp.validate()?;
        no_body(with_query(self.url_path.clone(), |qp| {
            wp.populate_qp(qp);
            qp.append_pair("resourceVersion", ver);
        }))
    }

    /// Get a single object
    pub fn get(&self, name: &str, gp: &GetParams) -> Result<http::Request<Vec<u8>>, Error> {
        let path = self.object_path(name, None)?;
        no_body(with_query(path, |qp| gp.populate_qp(qp)))
    }

    /// Create an object from a serialized body
    pub fn create(&self, pp: &PostParams, data: Vec<u8>) -> Result<http::Request<Vec<u8>>, Error> {
        pp.validate()?;
        let uri = with_query(self.url_path.clone(), |qp| pp.populate_qp(qp));
        json_body(http::Method::POST, uri, data)
    }

    /// Replace a named object with a serialized body
    ///
    /// The body should carry `metadata.resourceVersion` to guard against lost updates.
    pub fn replace(&self, name: &str, pp: &PostParams, data: Vec<u8>) -> Result<http::Request<Vec<u8>>, Error> {
        self.put(self.object_path(name, None)?, pp, data)
    }

    /// Delete a named object
    pub fn delete(&self, name: &str, dp: &DeleteParams) -> Result<http::Request<Vec<u8>>, Error> {
        let path = self.object_path(name, None)?;
        let body = serde_json::to_vec(&dp).map_err(Error::SerializeBody)?;
        json_body(http::Method::DELETE, path, body)
    }

    /// Delete all objects matching `lp`
    ///
    /// Every list option is forwarded in the query, the delete options travel as body.
    pub fn delete_collection(
        &self,
        dp: &DeleteParams,
        lp: &ListParams,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        lp.validate()?;
        let uri = with_query(self.url_path.clone(), |qp| lp.populate_qp(qp));
        let body = serde_json::to_vec(&dp).map_err(Error::SerializeBody)?;
        json_body(http::Method::DELETE, uri, body)
    }

    /// Patch a named object
    pub fn patch<P: serde::Serialize>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        self.send_patch(self.object_path(name, None)?, pp, patch)
    }

    fn send_patch<P: serde::Serialize>(
        &self,
        path: String,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        pp.validate(patch)?;
        let body = patch.serialize().map_err(Error::SerializeBody)?;
        http::Request::patch(with_query(path, |qp| pp.populate_qp(qp)))
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, patch.content_type())
            .body(body)
            .map_err(Error::BuildRequest)
    }

    fn put(&self, path: String, pp: &PostParams, data: Vec<u8>) -> Result<http::Request<Vec<u8>>, Error> {
        pp.validate()?;
        json_body(http::Method::PUT, with_query(path, |qp| pp.populate_qp(qp)), data)
    }
}

/// Subresources
///
/// `subresource_name` may span several path segments, e.g. `status` or `a/b`.
impl Request {
    /// Get a subresource of a named object
    pub fn get_subresource(&self, subresource_name: &str, name: &str) -> Result<http::Request<Vec<u8>>, Error> {
        no_body(self.object_path(name, Some(subresource_name))?)
    }

    /// Patch a subresource of a named object
    pub fn patch_subresource<P: serde::Serialize>(
        &self,
        subresource_name: &str,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        self.send_patch(self.object_path(name, Some(subresource_name))?, pp, patch)
    }

    /// Replace a subresource of a named object
    pub fn replace_subresource(
        &self,
        subresource_name: &str,
        name: &str,
        pp: &PostParams,
        data: Vec<u8>,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        self.put(self.object_path(name, Some(subresource_name))?, pp, data)
    }
}
