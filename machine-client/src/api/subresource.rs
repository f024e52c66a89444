use serde::Serialize;
use std::fmt::Debug;

use super::{json, tagged};
use crate::{api::Machines, Result};
use machine_core::{
    params::{Patch, PatchParams, PostParams},
    Machine,
};

const STATUS: &str = "status";

/// Subresources by name
///
/// `subresource` may span several path segments, e.g. `status` or `a/b`.
impl Machines {
    /// Read a machine through one of its subresources
    pub async fn get_subresource(&self, subresource: &str, name: &str) -> Result<Machine> {
        let req = tagged("get_subresource", self.request.get_subresource(subresource, name))?;
        self.client.request(req).await
    }

    /// Patch a machine through one of its subresources
    pub async fn patch_subresource<P: Serialize + Debug>(
        &self,
        subresource: &str,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<Machine> {
        let built = self.request.patch_subresource(subresource, name, pp, patch);
        self.client.request(tagged("patch_subresource", built)?).await
    }

    /// Overwrite a machine through one of its subresources
    pub async fn replace_subresource(
        &self,
        subresource: &str,
        name: &str,
        pp: &PostParams,
        data: &Machine,
    ) -> Result<Machine> {
        let built = self.request.replace_subresource(subresource, name, pp, json(data)?);
        self.client.request(tagged("replace_subresource", built)?).await
    }
}

/// The `status` subresource
///
/// Only the machine controller should write here; `spec` changes sent through it are dropped.
impl Machines {
    /// Read a machine through `status`
    ///
    /// The answer is the whole machine, not only its status.
    pub async fn get_status(&self, name: &str) -> Result<Machine> {
        let req = tagged("get_status", self.request.get_subresource(STATUS, name))?;
        self.client.request(req).await
    }

    /// Patch the status of a machine
    ///
    /// ```no_run
    /// use machine_client::{api::{Patch, PatchParams}, Machines};
    ///
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: machine_client::Client = todo!();
    /// let machines = Machines::namespaced(client, "shoot--dev--cluster");
    /// let data = serde_json::json!({
    ///     "status": {
    ///         "currentStatus": { "phase": "Running", "lastUpdateTime": "2024-05-01T10:00:00Z" }
    ///     }
    /// });
    /// let m = machines
    ///     .patch_status("worker-z1-7d9c8-abcde", &PatchParams::default(), &Patch::Merge(data))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn patch_status<P: Serialize + Debug>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<Machine> {
        let built = self.request.patch_subresource(STATUS, name, pp, patch);
        self.client.request(tagged("patch_status", built)?).await
    }

    /// Overwrite the status of a machine
    ///
    /// Like [`Machines::replace`], including the resourceVersion check.
    pub async fn replace_status(&self, name: &str, pp: &PostParams, data: &Machine) -> Result<Machine> {
        let built = self.request.replace_subresource(STATUS, name, pp, json(data)?);
        self.client.request(tagged("replace_status", built)?).await
    }
}
