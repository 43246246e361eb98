//! Repository layout for a chart submission.

use std::path::PathBuf;

/// Top-level directory holding every chart
pub const CHARTS_ROOT: &str = "charts";

/// Name of the owners document inside a chart directory
pub const OWNERS_FILE: &str = "OWNERS";

/// Name of the verifier report inside a version directory
pub const REPORT_FILE: &str = "report.yaml";

/// `charts/<vendor_type>/<vendor>/<chart_name>/<chart_version>/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartLayout {
    /// `partner`, `redhat`, `community`
    pub vendor_type: String,
    /// Vendor label
    pub vendor: String,
    /// Chart name
    pub chart_name: String,
    /// Chart version
    pub chart_version: semver::Version,
}

impl ChartLayout {
    /// Chart directory, relative to the repository root
    pub fn chart_dir(&self) -> PathBuf {
        [
            CHARTS_ROOT,
            self.vendor_type.as_str(),
            self.vendor.as_str(),
            self.chart_name.as_str(),
        ]
        .iter()
        .collect()
    }

    /// Version directory, relative to the repository root
    pub fn version_dir(&self) -> PathBuf {
        self.chart_dir().join(self.chart_version.to_string())
    }

    /// OWNERS file, relative to the repository root
    pub fn owners_path(&self) -> PathBuf {
        self.chart_dir().join(OWNERS_FILE)
    }

    /// Destination of a chart archive named `file_name`
    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.version_dir().join(file_name)
    }

    /// Destination of the rendered report
    pub fn report_path(&self) -> PathBuf {
        self.version_dir().join(REPORT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn layout() -> ChartLayout {
        ChartLayout {
            vendor_type: "partner".to_string(),
            vendor: "hashicorp-0a1b2c3d".to_string(),
            chart_name: "vault".to_string(),
            chart_version: semver::Version::new(0, 13, 0),
        }
    }

    #[test]
    fn test_paths() {
        let layout = layout();
        assert_eq!(
            layout.version_dir(),
            Path::new("charts/partner/hashicorp-0a1b2c3d/vault/0.13.0")
        );
        assert_eq!(
            layout.owners_path(),
            Path::new("charts/partner/hashicorp-0a1b2c3d/vault/OWNERS")
        );
        assert_eq!(
            layout.archive_path("vault-0.13.0.tgz"),
            Path::new("charts/partner/hashicorp-0a1b2c3d/vault/0.13.0/vault-0.13.0.tgz")
        );
        assert_eq!(
            layout.report_path(),
            Path::new("charts/partner/hashicorp-0a1b2c3d/vault/0.13.0/report.yaml")
        );
    }
}
