//! Unique vendor labels.

/// Append a short random token to `vendor`.
///
/// The token comes from a v4 UUID, so no OWNERS file already in the target
/// repository can authorize the resulting label.
pub fn unique_vendor_label(vendor: &str) -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", vendor.trim().to_lowercase(), &token[..8])
}
