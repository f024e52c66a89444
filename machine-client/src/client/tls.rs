#[cfg(feature = "rustls-tls")]
pub mod rustls_tls {
    use std::sync::Arc;

    use rustls::{
        self,
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        crypto::CryptoProvider,
        pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime},
        ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
    };
    use thiserror::Error;

    /// Errors from Rustls
    #[derive(Debug, Error)]
    pub enum Error {
        /// Identity PEM is invalid
        #[error("identity PEM is invalid: {0}")]
        InvalidIdentityPem(#[source] std::io::Error),

        /// Identity PEM is missing a private key: the key must be PKCS8, RSA/PKCS1 or SEC1
        #[error("identity PEM is missing a private key: the key must be PKCS8, RSA/PKCS1 or SEC1")]
        MissingPrivateKey,

        /// Identity PEM is missing certificate
        #[error("identity PEM is missing certificate")]
        MissingCertificate,

        /// Invalid private key
        #[error("invalid private key: {0}")]
        InvalidPrivateKey(#[source] rustls::Error),

        /// Failed to add a root certificate
        #[error("failed to add a root certificate: {0}")]
        AddRootCertificate(#[source] rustls::Error),

        /// The crypto provider rejected the default protocol versions
        #[error("unsupported protocol versions: {0}")]
        ProtocolVersions(#[source] rustls::Error),
    }

    /// Create `rustls::ClientConfig`.
    pub fn rustls_client_config(
        identity_pem: Option<&[u8]>,
        root_certs: Option<&[Vec<u8>]>,
        accept_invalid: bool,
    ) -> Result<ClientConfig, Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config_builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(Error::ProtocolVersions)?;

        let config_builder = if accept_invalid {
            config_builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoCertificateVerification(provider)))
        } else {
            config_builder.with_root_certificates(root_store(root_certs)?)
        };

        match identity_pem {
            Some(pem) => {
                let (chain, pkey) = client_auth(pem)?;
                config_builder
                    .with_client_auth_cert(chain, pkey)
                    .map_err(Error::InvalidPrivateKey)
            }
            None => Ok(config_builder.with_no_client_auth()),
        }
    }

    fn root_store(root_certs: Option<&[Vec<u8>]>) -> Result<RootCertStore, Error> {
        let mut root_store = RootCertStore::empty();
        for der in root_certs.unwrap_or_default() {
            root_store
                .add(CertificateDer::from(der.clone()))
                .map_err(Error::AddRootCertificate)?;
        }
        Ok(root_store)
    }

    fn client_auth(data: &[u8]) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), Error> {
        let chain = rustls_pemfile::certs(&mut &*data)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::InvalidIdentityPem)?;
        if chain.is_empty() {
            return Err(Error::MissingCertificate);
        }
        let pkey = rustls_pemfile::private_key(&mut &*data)
            .map_err(Error::InvalidIdentityPem)?
            .ok_or(Error::MissingPrivateKey)?;
        Ok((chain, pkey))
    }

    #[derive(Debug)]
    struct NoCertificateVerification(Arc<CryptoProvider>);

    impl ServerCertVerifier for NoCertificateVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            tracing::warn!("Server cert bypassed");
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }

}
