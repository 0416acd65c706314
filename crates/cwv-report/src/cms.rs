//! CMS detection from the first response's headers and the rendered markup.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Content management system behind a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cms {
    /// AEM Edge Delivery Services.
    #[serde(rename = "aem-eds")]
    AemEds,
    /// AEM as a Cloud Service.
    #[serde(rename = "aem-cs")]
    AemCs,
    /// AEM Managed Services (on-premise style deployments).
    #[serde(rename = "aem-ams")]
    AemAms,
    /// Not recognised.
    #[serde(rename = "unknown")]
    Unknown,
}

impl Cms {
    /// Identifier used in prompts and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AemEds => "aem-eds",
            Self::AemCs => "aem-cs",
            Self::AemAms => "aem-ams",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an identifier produced by [`Cms::as_str`]; anything else is unknown.
    pub fn from_id(id: &str) -> Self {
        match id {
            "aem-eds" => Self::AemEds,
            "aem-cs" => Self::AemCs,
            "aem-ams" => Self::AemAms,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Cms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EDS_MARKERS: &[&str] = &["/scripts/aem.js", "lib-franklin", "/scripts/lib-franklin.js"];
const CLOUD_HOST_MARKERS: &[&str] = &["adobeaemcloud.com", "adobeaemcloud.net"];
const CLIENTLIBS: &str = "/etc.clientlibs/";
const LEGACY_DESIGNS: &str = "/etc/designs/";

/// Detect the CMS of a page.
///
/// `headers` are the first HAR entry's response headers with lower-cased
/// names. Edge Delivery markers win over everything else; any `x-adobe-*`
/// header or a cloud host next to client libraries means Cloud Service.
pub fn detect_cms(headers: &BTreeMap<String, String>, html: &str) -> Cms {
    if EDS_MARKERS.iter().any(|m| html.contains(m)) {
        return Cms::AemEds;
    }

    let adobe_header = headers.keys().any(|name| name.starts_with("x-adobe-"));
    let cloud_host = CLOUD_HOST_MARKERS.iter().any(|m| html.contains(m));
    let clientlibs = html.contains(CLIENTLIBS);

    if adobe_header || (clientlibs && cloud_host) {
        return Cms::AemCs;
    }
    if clientlibs || html.contains(LEGACY_DESIGNS) {
        return Cms::AemAms;
    }
    Cms::Unknown
}
