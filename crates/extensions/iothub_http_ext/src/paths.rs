//! Pure helpers building the hub REST resource paths
//!
//! Device and module identifiers are percent-encoded before being embedded
//! in a path segment.

use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

/// Characters kept verbatim when an identifier is embedded in a path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_segment(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}

/// Path to invoke a method on a device, or on one of its modules
pub fn method_invoke_path(target_device_id: &str, target_module_id: Option<&str>) -> String {
    match target_module_id {
        Some(module_id) => format!(
            "/twins/{}/modules/{}/methods",
            encode_segment(target_device_id),
            encode_segment(module_id)
        ),
        None => format!("/twins/{}/methods", encode_segment(target_device_id)),
    }
}

/// Path to request storage credentials for a blob upload
pub fn storage_info_path(device_id: &str) -> String {
    format!("/devices/{}/files", encode_segment(device_id))
}

/// Path to report the outcome of a blob upload
pub fn upload_status_path(device_id: &str) -> String {
    format!("/devices/{}/files/notifications", encode_segment(device_id))
}
