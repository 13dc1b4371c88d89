use std::io::{BufRead, BufReader, Write};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::accession::{Accession, RecordKind};
use crate::domain::Format;
use crate::error::EnaError;
use crate::manifest::PortalRow;
use crate::query::QueryDescriptor;

pub const VIEW_BASE: &str = "https://www.ebi.ac.uk/ena/browser/api";
pub const PORTAL_BASE: &str = "https://www.ebi.ac.uk/ena/portal/api";

/// First line the record view answers with when it has nothing for an accession.
const MISSING_ENTRY_PREFIX: &[u8] = b"Entry:";

pub trait EnaClient: Send + Sync {
    /// Whether a live, non-empty record exists for the accession.
    fn is_available(&self, accession: &Accession) -> Result<bool, EnaError>;

    /// Streams the record view of `accession` in `format` into `out`.
    fn fetch_record(
        &self,
        accession: &str,
        format: Format,
        expanded: bool,
        out: &mut dyn Write,
    ) -> Result<u64, EnaError>;

    fn search(&self, query: &QueryDescriptor) -> Result<Vec<PortalRow>, EnaError>;
}

#[derive(Clone)]
pub struct EnaHttpClient {
    client: Client,
    view_base: String,
    portal_base: String,
}

impl EnaHttpClient {
    pub fn new() -> Result<Self, EnaError> {
        Self::with_base_urls(VIEW_BASE, PORTAL_BASE)
    }

    pub fn with_base_urls(view_base: &str, portal_base: &str) -> Result<Self, EnaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ena-browser-tools/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EnaError::PortalHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| EnaError::PortalHttp(err.to_string()))?;

        Ok(Self {
            client,
            view_base: view_base.trim_end_matches('/').to_string(),
            portal_base: portal_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn view_url(&self, accession: &str, format: Format, expanded: bool) -> String {
        let mut url = format!("{}/{}/{}", self.view_base, view_segment(format), accession);
        if expanded && format != Format::Xml {
            url.push_str("?expanded=true");
        }
        url
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, reqwest::Error>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        debug!(status, attempt, "retrying request");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        debug!(error = %err, attempt, "retrying request");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl EnaClient for EnaHttpClient {
    fn is_available(&self, accession: &Accession) -> Result<bool, EnaError> {
        let target = match accession.kind() {
            RecordKind::Taxon => format!("Taxon:{}", accession.as_str()),
            _ => accession.as_str().to_string(),
        };
        let url = self.view_url(&target, Format::Xml, false);
        debug!(url, "availability probe");
        let response = self
            .send_with_retries(|| self.client.get(&url))
            .map_err(|err| EnaError::ViewHttp(err.to_string()))?;
        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "record view request failed".to_string());
            return Err(EnaError::ViewStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| EnaError::ViewHttp(err.to_string()))?;
        Ok(record_present(&body))
    }

    fn fetch_record(
        &self,
        accession: &str,
        format: Format,
        expanded: bool,
        out: &mut dyn Write,
    ) -> Result<u64, EnaError> {
        let url = self.view_url(accession, format, expanded);
        debug!(url, "record view");
        let response = self
            .send_with_retries(|| self.client.get(&url))
            .map_err(|err| EnaError::ViewHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "record view request failed".to_string());
            return Err(EnaError::ViewStatus { status, message });
        }
        copy_record(BufReader::new(response), accession, out)
    }

    fn search(&self, query: &QueryDescriptor) -> Result<Vec<PortalRow>, EnaError> {
        let url = format!("{}/search", self.portal_base);
        let params = query.params();
        debug!(url, ?params, "portal search");
        let response = self
            .send_with_retries(|| self.client.get(&url).query(&params))
            .map_err(|err| EnaError::PortalHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "portal request failed".to_string());
            return Err(EnaError::PortalStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| EnaError::PortalHttp(err.to_string()))?;
        parse_rows(&body)
    }
}

fn view_segment(format: Format) -> &'static str {
    match format {
        Format::Fasta => "fasta",
        Format::Xml => "xml",
        _ => "embl",
    }
}

/// Copies a record body, refusing the service's "Entry: ... not found" answer
/// before anything is written.
pub fn copy_record<R: BufRead>(
    mut reader: R,
    accession: &str,
    out: &mut dyn Write,
) -> Result<u64, EnaError> {
    let head = reader
        .fill_buf()
        .map_err(|err| EnaError::ViewHttp(err.to_string()))?;
    if head.is_empty() || head.starts_with(MISSING_ENTRY_PREFIX) {
        return Err(EnaError::EmptyRecord(accession.to_string()));
    }
    std::io::copy(&mut reader, out).map_err(|err| EnaError::ViewHttp(err.to_string()))
}

/// An XML view describes a record when its root has child elements and does
/// not carry the "entry is not found" notice.
pub fn record_present(xml: &str) -> bool {
    let Ok(document) = roxmltree::Document::parse(xml) else {
        return false;
    };
    let root = document.root_element();
    let notice = root
        .descendants()
        .filter(|node| node.is_text())
        .filter_map(|node| node.text())
        .any(|text| text.contains("entry is not found"));
    !notice && root.children().any(|node| node.is_element())
}

/// Portal search results arrive as a JSON array of objects; an empty body means no rows.
pub fn parse_rows(body: &str) -> Result<Vec<PortalRow>, EnaError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|err| EnaError::PortalParse(err.to_string()))
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
