//! Reachability checks against the oVirt engines of a site pair.

use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::core::{DrError, Result};

/// CA download and credential check for one engine.
///
/// [`SiteManager`](super::SiteManager) is generic over this trait so tests can
/// run the full generate pipeline without a live engine.
pub trait SiteProbe: Send + Sync + 'static {
    /// Download the engine CA certificate for `site_url` into `dest`.
    fn fetch_ca(&self, site_url: &str, dest: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Log in to the engine API and list data centers.
    fn check_access(
        &self,
        site_url: &str,
        username: &str,
        password: &str,
        ca_file: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// CA endpoint of the engine serving `site_url`.
///
/// `https://engine.example.com/ovirt-engine/api` becomes
/// `http://engine.example.com/ovirt-engine/services/pki-resource?resource=ca-certificate&format=X509-PEM-CA`.
#[must_use]
pub fn ca_url(site_url: &str) -> String {
    let rest = site_url.split_once("://").map_or(site_url, |(_, rest)| rest);
    let host = rest.split('/').next().unwrap_or_default();
    format!("http://{host}/ovirt-engine/services/pki-resource?resource=ca-certificate&format=X509-PEM-CA")
}

/// [`SiteProbe`] talking to the engine over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSiteProbe {
    timeout: Duration,
    insecure: bool,
}

impl HttpSiteProbe {
    #[must_use]
    pub const fn new(timeout: Duration, insecure: bool) -> Self {
        Self {
            timeout,
            insecure,
        }
    }
}

impl SiteProbe for HttpSiteProbe {
    async fn fetch_ca(&self, site_url: &str, dest: &Path) -> Result<()> {
        let url = ca_url(site_url);
        debug!(target: "site::probe", %url, "fetching CA certificate");

        let fail = |reason: String| DrError::CaFetch {
            url: url.clone(),
            reason,
        };
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| fail(e.to_string()))?;
        let response = client.get(&url).send().await.map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }
        let body = response.bytes().await.map_err(|e| fail(e.to_string()))?;

        fs::write(dest, &body).await.map_err(|e| DrError::fs("write CA certificate", dest, &e))
    }

    async fn check_access(
        &self,
        site_url: &str,
        username: &str,
        password: &str,
        ca_file: &Path,
    ) -> Result<()> {
        let fail = |reason: String| DrError::Connectivity {
            url: site_url.to_string(),
            reason,
        };

        let pem = fs::read(ca_file).await.map_err(|e| DrError::fs("read CA certificate", ca_file, &e))?;
        let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| fail(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .add_root_certificate(certificate)
            .danger_accept_invalid_certs(self.insecure)
            .build()
            .map_err(|e| fail(e.to_string()))?;

        let url = format!("{}/datacenters", site_url.trim_end_matches('/'));
        debug!(target: "site::probe", %url, username, "checking engine access");
        let response = client
            .get(&url)
            .basic_auth(username, Some(password))
            .header("Version", "4")
            .header("Accept", "application/xml")
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(fail(format!("HTTP {}", response.status())))
        }
    }
}
