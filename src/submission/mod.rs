//! Chart submission assembly: vendor label, OWNERS, report, and layout.

mod builder;
mod layout;
mod owners;
mod report;
mod vendor;

pub use builder::{StagedSubmission, SubmissionBuilder};
pub use layout::{CHARTS_ROOT, ChartLayout, OWNERS_FILE, REPORT_FILE};
pub use owners::{OWNERS_TEMPLATE, OwnersFile, OwnersUser, OwnersVendor, render_owners};
pub use report::ChartReport;
pub use vendor::unique_vendor_label;
