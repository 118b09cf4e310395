//! Direct TLS handshake against an item URL's own host, used by the
//! certificate check to read the leaf certificate's expiry and issuer.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore};
use x509_parser::prelude::*;

const HTTPS_PORT: u16 = 443;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The server answered but its chain or name did not verify.
    #[error("certificate rejected: {0}")]
    Rejected(String),
    #[error("{0}")]
    Failed(String),
}

/// Expiry and issuer read from a leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFacts {
    pub expires_in_days: i64,
    pub issuer: Option<String>,
}

/// Host and port of an `https://` URL. Redirects are never followed, so the
/// certificate inspected always belongs to this endpoint.
pub fn https_endpoint(url: &str) -> Option<(String, u16)> {
    let scheme_len = "https://".len();
    if !url.get(..scheme_len)?.eq_ignore_ascii_case("https://") {
        return None;
    }
    let authority = url[scheme_len..].split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) if !host.starts_with('[') || host.ends_with(']') => {
            (host, port.parse().ok()?)
        }
        _ => (host_port, HTTPS_PORT),
    };
    let host = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();
    (!host.is_empty()).then_some((host, port))
}

fn client_config() -> Result<Arc<ClientConfig>, HandshakeError> {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|err| HandshakeError::Failed(err.to_string()))?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Complete a verified handshake and return the server's leaf certificate.
pub fn peer_certificate(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<CertificateDer<'static>, HandshakeError> {
    let name = ServerName::try_from(host.to_string())
        .map_err(|err| HandshakeError::Failed(format!("invalid server name {host:?}: {err}")))?;
    let mut connection = ClientConnection::new(client_config()?, name)
        .map_err(|err| HandshakeError::Failed(err.to_string()))?;

    let address = (host, port)
        .to_socket_addrs()
        .map_err(failed)?
        .next()
        .ok_or_else(|| HandshakeError::Failed(format!("no address for {host}")))?;
    let mut socket = TcpStream::connect_timeout(&address, timeout).map_err(failed)?;
    socket.set_read_timeout(Some(timeout)).map_err(failed)?;
    socket.set_write_timeout(Some(timeout)).map_err(failed)?;

    while connection.is_handshaking() {
        connection.complete_io(&mut socket).map_err(classify)?;
    }

    connection
        .peer_certificates()
        .and_then(|chain| chain.first())
        .map(|leaf| leaf.clone().into_owned())
        .ok_or_else(|| HandshakeError::Failed("server sent no certificate".to_string()))
}

fn failed(err: io::Error) -> HandshakeError {
    HandshakeError::Failed(err.to_string())
}

/// rustls surfaces verification failures as `InvalidData` io errors wrapping
/// the typed error.
fn classify(err: io::Error) -> HandshakeError {
    match err.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
        Some(rustls::Error::InvalidCertificate(reason)) => {
            HandshakeError::Rejected(format!("{reason:?}"))
        }
        _ => failed(err),
    }
}

/// Days until `notAfter` (floored, negative once expired) and the issuer's
/// attribute values joined with `", "`.
pub fn certificate_facts(der: &[u8], now: DateTime<Utc>) -> Result<CertificateFacts, String> {
    let (_, parsed) = X509Certificate::from_der(der).map_err(|err| format!("unparseable certificate: {err}"))?;
    let not_after = parsed.validity().not_after.timestamp();
    let issuer_parts: Vec<&str> = parsed
        .issuer()
        .iter_attributes()
        .filter_map(|attribute| attribute.as_str().ok())
        .collect();

    Ok(CertificateFacts {
        expires_in_days: (not_after - now.timestamp()).div_euclid(SECONDS_PER_DAY),
        issuer: (!issuer_parts.is_empty()).then(|| issuer_parts.join(", ")),
    })
}
