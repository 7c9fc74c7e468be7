//! User-agent composition for outgoing hub requests

use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

/// Product identifier sent with every HTTP request
pub const PRODUCT_INFO: &str = concat!("iothub-device-client/", env!("CARGO_PKG_VERSION"));

/// Characters kept verbatim in the encoded user agent
const USER_AGENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The `User-Agent` header value: the product identifier followed by the
/// custom product info, percent-escaped as a whole with spaces as `+`
pub fn user_agent(custom_product_info: &str) -> String {
    quote_plus(&format!("{PRODUCT_INFO}{custom_product_info}"))
}

fn quote_plus(value: &str) -> String {
    utf8_percent_encode(value, USER_AGENT)
        .to_string()
        .replace("%20", "+")
}
