use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Configuration shared by all the stages of a pipeline
///
/// Built once, at connection time, and immutable afterwards: stages read it
/// through the [Nucleus](crate::Nucleus) without further synchronization.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Hostname of the hub this device talks to
    pub hostname: String,

    /// Hostname of the gateway, when the device sits behind an edge gateway
    #[serde(default)]
    pub gateway_hostname: Option<String>,

    pub device_id: String,

    /// Module identity, when the client acts on behalf of a module
    #[serde(default)]
    pub module_id: Option<String>,

    /// Shared-access token material, acquired and renewed outside this crate
    #[serde(default)]
    pub sas_token: Option<String>,

    /// Custom product info appended to the user agent of outgoing requests
    ///
    /// Kept as a raw JSON value: a non-string value is stringified where
    /// used, not rejected.
    #[serde(default)]
    pub product_info: Value,
}

impl PipelineConfig {
    pub fn new(hostname: impl Into<String>, device_id: impl Into<String>) -> Self {
        PipelineConfig {
            hostname: hostname.into(),
            gateway_hostname: None,
            device_id: device_id.into(),
            module_id: None,
            sas_token: None,
            product_info: Value::Null,
        }
    }

    pub fn with_gateway_hostname(mut self, gateway_hostname: impl Into<String>) -> Self {
        self.gateway_hostname = Some(gateway_hostname.into());
        self
    }

    pub fn with_module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    pub fn with_sas_token(mut self, sas_token: impl Into<String>) -> Self {
        self.sas_token = Some(sas_token.into());
        self
    }

    pub fn with_product_info(mut self, product_info: impl Into<Value>) -> Self {
        self.product_info = product_info.into();
        self
    }

    /// The product info in its textual form
    ///
    /// A non-string value is rendered as compact JSON rather than rejected.
    pub fn product_info_text(&self) -> String {
        match &self.product_info {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            value => value.to_string(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.is_empty() {
            return Err(ConfigError::NotSet("hostname"));
        }
        if self.device_id.is_empty() {
            return Err(ConfigError::NotSet("device_id"));
        }
        Ok(())
    }
}

/// The errors that could occur while assembling a pipeline
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required setting not provided: {0}")]
    NotSet(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_info_defaults_to_an_empty_text() {
        let config = PipelineConfig::new("my.hub.hostname", "my_device");
        assert_eq!(config.product_info_text(), "");
    }

    #[test]
    fn a_string_product_info_is_kept_verbatim() {
        let config = PipelineConfig::new("my.hub.hostname", "my_device")
            .with_product_info("MyProductInfo");
        assert_eq!(config.product_info_text(), "MyProductInfo");
    }

    #[test]
    fn a_non_string_product_info_is_stringified_not_rejected() {
        let config =
            PipelineConfig::new("my.hub.hostname", "my_device").with_product_info(json!(12345));
        assert_eq!(config.product_info_text(), "12345");

        let config = PipelineConfig::new("my.hub.hostname", "my_device")
            .with_product_info(json!({"build": 7}));
        assert_eq!(config.product_info_text(), r#"{"build":7}"#);
    }

    #[test]
    fn a_config_can_be_deserialized_with_optionals_omitted() {
        let config: PipelineConfig = serde_json::from_value(json!({
            "hostname": "my.hub.hostname",
            "device_id": "my_device",
        }))
        .unwrap();
        assert_eq!(config.gateway_hostname, None);
        assert_eq!(config.module_id, None);
        assert_eq!(config.product_info, Value::Null);
    }

    #[test]
    fn an_incomplete_config_is_rejected_at_validation() {
        let config = PipelineConfig::new("", "my_device");
        assert!(config.validate().is_err());

        let config = PipelineConfig::new("my.hub.hostname", "");
        assert!(config.validate().is_err());
    }
}
