//! OWNERS document for the submitted chart.
//!
//! The rendered document names the vendor but lists no users, which is what
//! makes the submission unauthorized.

use crate::error::{E2eError, FixtureError, Result};
use crate::template::{OwnersFields, render};
use serde::Deserialize;
use std::path::PathBuf;

/// OWNERS template with `${chart_name}` and `${vendor}` placeholders
pub const OWNERS_TEMPLATE: &str = "\
chart:
  name: ${chart_name}
  shortDescription: Test chart for testing chart submission workflows.
publicPgpKey: null
users: []
vendor:
  label: ${vendor}
  name: ${vendor}
";

/// An authorized user entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnersUser {
    /// GitHub login
    #[serde(rename = "githubUsername")]
    pub github_username: String,
}

/// Vendor section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnersVendor {
    /// Directory label
    pub label: String,
    /// Display name
    pub name: String,
}

/// Chart section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnersChart {
    /// Chart name
    pub name: String,
    /// One-line description
    #[serde(rename = "shortDescription", default)]
    pub short_description: Option<String>,
}

/// Parsed OWNERS document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnersFile {
    /// Chart the file governs
    pub chart: OwnersChart,
    /// Users allowed to submit
    #[serde(default)]
    pub users: Vec<OwnersUser>,
    /// Vendor owning the chart
    pub vendor: OwnersVendor,
    /// Key used to verify signed submissions
    #[serde(rename = "publicPgpKey", default)]
    pub public_pgp_key: Option<String>,
}

impl OwnersFile {
    /// Parse an OWNERS document
    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            E2eError::from(FixtureError::Malformed {
                path: PathBuf::from("OWNERS"),
                reason: e.to_string(),
            })
        })
    }

    /// Whether `login` is listed as an authorized user
    pub fn authorizes(&self, login: &str) -> bool {
        self.users
            .iter()
            .any(|u| u.github_username.eq_ignore_ascii_case(login))
    }

    /// Fail unless the document authorizes nobody, in particular not `vendor`
    pub fn ensure_unauthorized(&self, vendor: &str) -> Result<()> {
        if self.users.is_empty() && !self.authorizes(vendor) {
            Ok(())
        } else {
            Err(FixtureError::VendorAuthorized {
                vendor: vendor.to_string(),
            }
            .into())
        }
    }
}

/// Render the OWNERS document for `vendor` and check it authorizes nobody
pub fn render_owners(vendor: &str, chart_name: &str) -> Result<String> {
    let content = render(OWNERS_TEMPLATE, &OwnersFields { vendor, chart_name })?;
    OwnersFile::parse(&content)?.ensure_unauthorized(vendor)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::unique_vendor_label;

    #[test]
    fn test_rendered_owners_has_no_users() {
        let vendor = unique_vendor_label("hashicorp");
        let content = render_owners(&vendor, "vault").unwrap();
        let owners = OwnersFile::parse(&content).unwrap();
        assert!(owners.users.is_empty());
        assert_eq!(owners.vendor.label, vendor);
        assert_eq!(owners.vendor.name, vendor);
        assert_eq!(owners.chart.name, "vault");
        assert_eq!(owners.public_pgp_key, None);
    }

    #[test]
    fn test_generated_vendor_is_never_authorized() {
        let current = OwnersFile::parse(
            "chart:\n  name: vault\nusers:\n  - githubUsername: hashicorp\n  - githubUsername: helm-bot\nvendor:\n  label: hashicorp\n  name: HashiCorp\n",
        )
        .unwrap();
        for _ in 0..64 {
            let vendor = unique_vendor_label("hashicorp");
            assert!(!current.authorizes(&vendor));
        }
        assert!(current.authorizes("HashiCorp"));
    }

    #[test]
    fn test_populated_users_fail_the_precondition() {
        let owners = OwnersFile::parse(
            "chart:\n  name: vault\nusers:\n  - githubUsername: someone\nvendor:\n  label: acme\n  name: acme\n",
        )
        .unwrap();
        assert!(matches!(
            owners.ensure_unauthorized("acme-1234"),
            Err(E2eError::Fixture(FixtureError::VendorAuthorized { .. }))
        ));
    }

    #[test]
    fn test_template_only_needs_owners_fields() {
        let template = crate::template::Template::parse(OWNERS_TEMPLATE).unwrap();
        assert_eq!(template.placeholders(), vec!["chart_name", "vendor"]);
    }
}
