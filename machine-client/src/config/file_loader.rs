use super::{
    file_config::{find, AuthInfo, Cluster, Context, Kubeconfig},
    KubeconfigError,
};

/// Overrides for the entries picked from a kubeconfig
///
/// Unset fields follow `current-context`.
#[derive(Default, Clone, Debug)]
pub struct KubeConfigOptions {
    /// Context to use instead of `current-context`
    pub context: Option<String>,
    /// Cluster to use instead of the context's
    pub cluster: Option<String>,
    /// User to use instead of the context's
    pub user: Option<String>,
}

/// The context, cluster and user selected from a kubeconfig
#[derive(Clone, Debug)]
pub(crate) struct ConfigLoader {
    pub context: Context,
    pub cluster: Cluster,
    pub user: AuthInfo,
}

impl ConfigLoader {
    pub fn new_from_options(options: &KubeConfigOptions) -> Result<Self, KubeconfigError> {
        Self::select(&Kubeconfig::read()?, options)
    }

    pub fn select(config: &Kubeconfig, options: &KubeConfigOptions) -> Result<Self, KubeconfigError> {
        let context_name = options
            .context
            .as_deref()
            .or(config.current_context.as_deref())
            .ok_or(KubeconfigError::CurrentContextNotSet)?;
        let context = find(&config.contexts, context_name)
            .ok_or_else(|| KubeconfigError::LoadContext(context_name.to_owned()))?
            .clone();

        let cluster_name = options.cluster.as_deref().unwrap_or(&context.cluster);
        let cluster = find(&config.clusters, cluster_name)
            .ok_or_else(|| KubeconfigError::LoadClusterOfContext(cluster_name.to_owned()))?
            .clone();

        let user_name = options.user.as_deref().unwrap_or(&context.user);
        let user = find(&config.users, user_name)
            .ok_or_else(|| KubeconfigError::FindUser(user_name.to_owned()))?
            .clone();

        Ok(Self { context, cluster, user })
    }

    pub fn ca_bundle(&self) -> Result<Option<Vec<Vec<u8>>>, KubeconfigError> {
        self.cluster
            .load_certificate_authority()?
            .map(|bundle| super::certs(&bundle).map_err(KubeconfigError::ParseCertificates))
            .transpose()
    }
}
