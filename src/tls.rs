//! Throwaway TLS identity for the test server. Each server generates its own
//! self-signed certificate and the matching client trusts only that one.

use std::{net::Ipv4Addr, sync::Arc};

use rcgen::CertifiedKey;
use rustls::{
    crypto::{ring, CryptoProvider},
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName},
    ClientConfig,
    RootCertStore,
    ServerConfig,
};

use crate::{config::Config, Error};

const ALPN_HTTP1: &[u8] = b"http/1.1";

/// Self-signed certificate and its private key.
pub(crate) struct Identity {
    certificate: CertificateDer<'static>,
    key: PrivatePkcs8KeyDer<'static>,
}

impl Identity {
    /// Generates a certificate valid for every configured server name and
    /// for the loopback address.
    pub fn generate(config: &Config) -> Result<Self, Error> {
        let mut names = config.server_names.clone();
        if names.is_empty() {
            names.push(String::from(config.server_name()));
        }
        names.push(Ipv4Addr::LOCALHOST.to_string());

        let CertifiedKey { cert, key_pair } = rcgen::generate_simple_self_signed(names)?;

        Ok(Self {
            certificate: cert.der().clone(),
            key: PrivatePkcs8KeyDer::from(key_pair.serialize_der()),
        })
    }

    pub fn server_config(&self) -> Result<Arc<ServerConfig>, Error> {
        let mut config = ServerConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(
                vec![self.certificate.clone()],
                PrivateKeyDer::Pkcs8(self.key.clone_key()),
            )?;

        config.alpn_protocols = vec![ALPN_HTTP1.to_vec()];

        Ok(Arc::new(config))
    }

    pub fn client_config(&self) -> Result<Arc<ClientConfig>, Error> {
        let mut roots = RootCertStore::empty();
        roots.add(self.certificate.clone())?;

        let mut config = ClientConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

        config.alpn_protocols = vec![ALPN_HTTP1.to_vec()];

        Ok(Arc::new(config))
    }
}

/// Parses a host into the name used for SNI and verification.
pub(crate) fn server_name(host: &str) -> Result<ServerName<'static>, Error> {
    ServerName::try_from(host.to_owned()).map_err(|_| Error::InvalidServerName(host.to_owned()))
}

/// Picks `ring` explicitly instead of relying on a process wide default.
fn provider() -> Arc<CryptoProvider> {
    Arc::new(ring::default_provider())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_configs() {
        let identity = Identity::generate(&Config::default()).unwrap();

        let server = identity.server_config().unwrap();
        let client = identity.client_config().unwrap();

        assert_eq!(server.alpn_protocols, vec![b"http/1.1".to_vec()]);
        assert_eq!(client.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn server_names() {
        assert!(server_name("localhost").is_ok());
        assert!(server_name("127.0.0.1").is_ok());
        assert!(matches!(
            server_name("not a host"),
            Err(Error::InvalidServerName(_))
        ));
    }
}
