//! Invocation event and result wire types.
//!
//! These mirror the upstream gateway's proxy-integration shapes field for
//! field, so handlers run unmodified here and in production. Empty maps are
//! written as `null`, the way the gateway sends them.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The request as seen by a handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    pub resource: String,
    pub path: String,
    pub http_method: String,

    #[serde(default, with = "nullable")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, with = "nullable")]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,

    #[serde(default, with = "nullable")]
    pub query_string_parameters: BTreeMap<String, String>,

    #[serde(default, with = "nullable")]
    pub multi_value_query_string_parameters: BTreeMap<String, Vec<String>>,

    #[serde(default, with = "nullable")]
    pub path_parameters: BTreeMap<String, String>,

    #[serde(default, with = "nullable")]
    pub stage_variables: BTreeMap<String, String>,

    pub request_context: RequestContext,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub resource_path: String,
    pub http_method: String,
    pub path: String,
    pub protocol: String,
    pub stage: String,
    pub request_id: String,
    pub request_time_epoch: u64,
    pub identity: Identity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub source_ip: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// The response a handler returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,

    #[serde(default, deserialize_with = "lenient_headers", skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(
        default,
        deserialize_with = "lenient_multi_value_headers",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

mod nullable {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, V>(map: &BTreeMap<String, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        if map.is_empty() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(map)
        }
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        Ok(Option::deserialize(deserializer)?.unwrap_or_default())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// Header values may be numbers or booleans; the gateway stringifies them.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_headers<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k, v)))
        .collect())
}

fn lenient_multi_value_headers<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Vec<Value>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, values)| (k, values.into_iter().filter_map(scalar_to_string).collect()))
        .collect())
}
