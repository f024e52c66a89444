//! Typed access to the `machines` collection

mod core_methods;
mod subresource;

use std::fmt::Debug;

pub use machine_core::{
    metadata::{ListMeta, ObjectMeta, TypeMeta},
    object::ObjectList,
    params::{
        DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams, Preconditions,
        PropagationPolicy, ValidationDirective, VersionMatch, WatchParams,
    },
    request::Request,
    watch::WatchEvent,
    Machine, MachineList, Resource, ResourceExt,
};

use crate::{Client, Config, Error, Result};

/// Client for [`Machine`] objects
///
/// Wraps a [`Request`] builder for the `machines` collection (cluster wide or
/// in one namespace) and a [`Client`] that executes the built requests.
#[derive(Clone)]
pub struct Machines {
    /// The request builder object with its resource dependent url
    pub(crate) request: Request,
    /// The client to use (from this library)
    pub(crate) client: Client,
    namespace: Option<String>,
}

impl Machines {
    /// Machines viewed across all namespaces
    ///
    /// ```no_run
    /// # use machine_client::{Client, Machines};
    /// # let client: Client = todo!();
    /// let machines = Machines::all(client);
    /// ```
    pub fn all(client: Client) -> Self {
        Self {
            client,
            request: Request::new(Machine::url_path(None)),
            namespace: None,
        }
    }

    /// Machines within a given namespace
    ///
    /// ```no_run
    /// # use machine_client::{Client, Machines};
    /// # let client: Client = todo!();
    /// let machines = Machines::namespaced(client, "shoot--dev--cluster");
    /// ```
    pub fn namespaced(client: Client, ns: &str) -> Self {
        Self {
            client,
            request: Request::new(Machine::url_path(Some(ns))),
            namespace: Some(ns.to_string()),
        }
    }

    /// Machines within the default namespace
    ///
    /// The namespace is either configured on `context` in the kubeconfig
    /// or falls back to `default` when running locally, and it's using the service account's
    /// namespace when deployed in-cluster.
    pub fn default_namespaced(client: Client) -> Self {
        let ns = client.default_namespace().to_string();
        Self::namespaced(client, &ns)
    }

    /// The namespace this client is scoped to, `None` when cluster wide
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Consume self and return the [`Client`]
    pub fn into_client(self) -> Client {
        self.into()
    }

    /// Return a reference to the current resource url path
    pub fn resource_url(&self) -> &str {
        &self.request.url_path
    }
}

// Built requests carry their verb as an extension, which names the trace span.
fn tagged(verb: &'static str, built: std::result::Result<http::Request<Vec<u8>>, machine_core::request::Error>) -> Result<http::Request<Vec<u8>>> {
    let mut req = built.map_err(Error::BuildRequest)?;
    req.extensions_mut().insert(verb);
    Ok(req)
}

fn json(machine: &Machine) -> Result<Vec<u8>> {
    serde_json::to_vec(machine).map_err(Error::SerdeError)
}

impl From<Machines> for Client {
    fn from(api: Machines) -> Self {
        api.client
    }
}

impl Debug for Machines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Intentionally destructuring, to cause compile errors when new fields are added
        let Self {
            request,
            client: _,
            namespace,
        } = self;
        f.debug_struct("Machines")
            .field("request", &request)
            .field("client", &"...")
            .field("namespace", &namespace)
            .finish()
    }
}

/// Hands out [`Machines`] clients
///
/// Implemented by the group client of `machine.sapcloud.io`.
pub trait MachinesGetter {
    /// A [`Machines`] client for the getter's namespace scope
    fn machines(&self) -> Machines;
}

/// Group client for `machine.sapcloud.io/v1alpha1`
///
/// Holds the shared [`Client`] and an optional namespace. Without a namespace,
/// [`MachinesGetter::machines`] addresses machines across all namespaces.
///
/// ```no_run
/// use machine_client::{MachineClient, MachinesGetter};
///
/// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let group = MachineClient::try_default().await?.namespace("shoot--dev--cluster");
/// let worker = group.machines().get("worker-z1-7d9c8-abcde").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MachineClient {
    client: Client,
    namespace: Option<String>,
}

impl MachineClient {
    /// Group client over an existing [`Client`], scoped to all namespaces
    pub fn new(client: Client) -> Self {
        Self {
            client,
            namespace: None,
        }
    }

    /// Group client over a [`Client`] built from the inferred environment
    ///
    /// See [`Client::try_default`].
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }

    /// Scope handed out clients to a namespace
    #[must_use]
    pub fn namespace(mut self, ns: &str) -> Self {
        self.namespace = Some(ns.to_string());
        self
    }

    /// Scope handed out clients to the client's default namespace
    #[must_use]
    pub fn default_namespace(self) -> Self {
        let ns = self.client.default_namespace().to_string();
        self.namespace(&ns)
    }

    /// The underlying [`Client`]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl TryFrom<Config> for MachineClient {
    type Error = crate::Error;

    fn try_from(config: Config) -> Result<Self> {
        Ok(Self::new(Client::try_from(config)?))
    }
}

impl MachinesGetter for MachineClient {
    fn machines(&self) -> Machines {
        match &self.namespace {
            Some(ns) => Machines::namespaced(self.client.clone(), ns),
            None => Machines::all(self.client.clone()),
        }
    }
}

impl Debug for MachineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineClient")
            .field("client", &"...")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::{MachineClient, Machines, MachinesGetter};
    use crate::{client::Body, Client};

    use http::{Request, Response};
    use tower_test::mock;

    #[tokio::test]
    async fn constructors_pick_collection_paths() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let client = Client::new(mock_service, "machine-controller");

        let all = Machines::all(client.clone());
        assert_eq!(all.resource_url(), "/apis/machine.sapcloud.io/v1alpha1/machines");
        assert_eq!(all.namespace(), None);

        let ns = Machines::default_namespaced(client.clone());
        assert_eq!(
            ns.resource_url(),
            "/apis/machine.sapcloud.io/v1alpha1/namespaces/machine-controller/machines"
        );
        assert_eq!(ns.namespace(), Some("machine-controller"));

        let group = MachineClient::new(client);
        assert_eq!(group.machines().namespace(), None);
        let scoped = group.namespace("shoot--dev--cluster").machines();
        assert_eq!(
            scoped.resource_url(),
            "/apis/machine.sapcloud.io/v1alpha1/namespaces/shoot--dev--cluster/machines"
        );
    }

    #[tokio::test]
    async fn group_client_default_namespace() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let group = MachineClient::new(Client::new(mock_service, "garden")).default_namespace();
        assert_eq!(group.machines().namespace(), Some("garden"));
        assert!(format!("{group:?}").contains("garden"));
    }
}
