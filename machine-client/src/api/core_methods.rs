use either::Either;
use futures::Stream;
use serde::Serialize;
use std::fmt::Debug;

use super::{json, tagged};
use crate::{api::Machines, Error, Result};
use machine_core::{
    object::ObjectList, params::*, request, response::Status, ErrorResponse, Machine, WatchEvent,
};

/// Verbs on the `machines` collection and its members
impl Machines {
    /// Read a machine by name
    ///
    /// ```no_run
    /// # use machine_client::Machines;
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: machine_client::Client = todo!();
    /// let machines = Machines::namespaced(client, "shoot--dev--cluster");
    /// let m = machines.get("worker-z1-7d9c8-abcde").await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// A missing machine is an [`Error::Api`] with code 404; [`Machines::get_opt`]
    /// turns that into `None`.
    pub async fn get(&self, name: &str) -> Result<Machine> {
        self.get_with(name, &GetParams::default()).await
    }

    /// [`get`](Machines::get) at a chosen resourceVersion
    ///
    /// `GetParams::any()` lets the apiserver answer from its cache.
    pub async fn get_with(&self, name: &str, gp: &GetParams) -> Result<Machine> {
        let req = tagged("get", self.request.get(name, gp))?;
        self.client.request(req).await
    }

    /// [`get`](Machines::get), with `None` for a missing machine
    ///
    /// Any `404` counts as missing, also when a proxy answered without a `Status` body.
    pub async fn get_opt(&self, name: &str) -> Result<Option<Machine>> {
        match self.get(name).await {
            Err(Error::Api(ErrorResponse { code: 404, .. })) => Ok(None),
            found => found.map(Some),
        }
    }

    /// List the machines in scope
    ///
    /// ```no_run
    /// use machine_client::{api::{ListParams, ResourceExt}, Machines};
    ///
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: machine_client::Client = todo!();
    /// let machines = Machines::namespaced(client, "shoot--dev--cluster");
    /// let lp = ListParams::default().labels("name=worker-z1"); // one machine deployment
    /// for m in machines.list(&lp).await? {
    ///     println!("{}", m.name_any());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// With [`ListParams::limit`] set, follow `metadata.continue` of the answer to read further pages.
    pub async fn list(&self, lp: &ListParams) -> Result<ObjectList<Machine>> {
        let req = tagged("list", self.request.list(lp))?;
        self.client.request(req).await
    }

    /// Create a machine
    ///
    /// `metadata.name` must be free in the namespace, unless `metadata.generateName` is used.
    pub async fn create(&self, pp: &PostParams, data: &Machine) -> Result<Machine> {
        let req = tagged("create", self.request.create(pp, json(data)?))?;
        self.client.request(req).await
    }

    /// [`replace`](Machines::replace) using the machine's own `metadata.name`
    ///
    /// Without a name nothing is sent and the call fails with [`Error::BuildRequest`].
    pub async fn update(&self, pp: &PostParams, data: &Machine) -> Result<Machine> {
        let Some(name) = data.metadata.name.as_deref() else {
            return Err(Error::BuildRequest(request::Error::Validation(
                "Machine to update must have metadata.name".into(),
            )));
        };
        let req = tagged("update", self.request.replace(name, pp, json(data)?))?;
        self.client.request(req).await
    }

    /// Overwrite a named machine
    ///
    /// Keep the `metadata.resourceVersion` of the machine you started from: the
    /// apiserver then refuses with `409 Conflict` if it changed in between.
    ///
    /// ```no_run
    /// use machine_client::{api::PostParams, Machines};
    ///
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: machine_client::Client = todo!();
    /// let machines = Machines::namespaced(client, "shoot--dev--cluster");
    /// let mut m = machines.get("worker-z1-7d9c8-abcde").await?;
    /// m.spec.provider_id = Some("aws:///eu-west-1/i-0abc".into());
    /// machines.replace("worker-z1-7d9c8-abcde", &PostParams::default(), &m).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn replace(&self, name: &str, pp: &PostParams, data: &Machine) -> Result<Machine> {
        let req = tagged("replace", self.request.replace(name, pp, json(data)?))?;
        self.client.request(req).await
    }

    /// Delete a named machine
    ///
    /// The machine controller keeps a finalizer on every machine, so the usual
    /// answer is `Left` with `deletionTimestamp` set. `Right` carries the
    /// apiserver's `Status` once nothing is left to return.
    pub async fn delete(&self, name: &str, dp: &DeleteParams) -> Result<Either<Machine, Status>> {
        let req = tagged("delete", self.request.delete(name, dp))?;
        self.client.request_status(req).await
    }

    /// Delete every machine matching `lp`
    ///
    /// Answers like [`delete`](Machines::delete), with the list of affected machines on `Left`.
    ///
    /// ```no_run
    /// use machine_client::{api::{DeleteParams, ListParams, ResourceExt}, Machines};
    ///
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: machine_client::Client = todo!();
    /// let machines = Machines::namespaced(client, "shoot--dev--cluster");
    /// let failed = ListParams::default().fields("status.currentStatus.phase=Failed");
    /// if let either::Left(list) = machines.delete_collection(&DeleteParams::default(), &failed).await? {
    ///     let names: Vec<_> = list.iter().map(ResourceExt::name_any).collect();
    ///     println!("deleting {names:?}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn delete_collection(
        &self,
        dp: &DeleteParams,
        lp: &ListParams,
    ) -> Result<Either<ObjectList<Machine>, Status>> {
        let req = tagged("delete_collection", self.request.delete_collection(dp, lp))?;
        self.client.request_status(req).await
    }

    /// Patch a named machine
    ///
    /// The [`Patch`] variant picks the strategy.
    ///
    /// ```no_run
    /// use machine_client::{api::{Patch, PatchParams}, Machines};
    ///
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: machine_client::Client = todo!();
    /// let machines = Machines::namespaced(client, "shoot--dev--cluster");
    /// let labels = serde_json::json!({
    ///     "apiVersion": "machine.sapcloud.io/v1alpha1",
    ///     "kind": "Machine",
    ///     "metadata": {
    ///         "labels": { "node.gardener.cloud/critical-components-not-ready": "true" }
    ///     }
    /// });
    /// let m = machines
    ///     .patch("worker-z1-7d9c8-abcde", &PatchParams::apply("mcm"), &Patch::Apply(&labels))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn patch<P: Serialize + Debug>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<Machine> {
        let req = tagged("patch", self.request.patch(name, pp, patch))?;
        self.client.request(req).await
    }

    /// Stream changes to the machines in scope, starting after `version`
    ///
    /// The apiserver closes a watch at will, at the latest after [`WatchParams::timeout`].
    /// Resume with the resourceVersion of the last event seen; a `410 Gone` means it is
    /// too old and a fresh [`list`](Machines::list) is needed.
    ///
    /// ```no_run
    /// use machine_client::{api::{ResourceExt, WatchEvent, WatchParams}, Machines};
    /// use futures::{StreamExt, TryStreamExt};
    ///
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: machine_client::Client = todo!();
    /// let machines = Machines::namespaced(client, "shoot--dev--cluster");
    /// let wp = WatchParams::default().labels("name=worker-z1");
    /// let mut events = machines.watch(&wp, "0").await?.boxed();
    /// while let Some(event) = events.try_next().await? {
    ///     match event {
    ///         WatchEvent::Added(m) | WatchEvent::Modified(m) => println!("seen {}", m.name_any()),
    ///         WatchEvent::Deleted(m) => println!("gone {}", m.name_any()),
    ///         WatchEvent::Bookmark(_) => {}
    ///         WatchEvent::Error(e) => println!("{e}"),
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn watch(
        &self,
        wp: &WatchParams,
        version: &str,
    ) -> Result<impl Stream<Item = Result<WatchEvent<Machine>>>> {
        let req = tagged("watch", self.request.watch(wp, version))?;
        self.client.request_events(req).await
    }
}
