use std::collections::HashMap;

use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::{config::Region, types::AttributeValue, Client};
use serde_json::{Map, Number, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;

use crate::{config::StoreConfig, error::StoreError};

pub type Item = HashMap<String, AttributeValue>;

/// Builds the process-wide DynamoDB client. Called once from `AppState::init`.
pub async fn connect(cfg: &StoreConfig) -> Client {
    let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));

    if let Some(endpoint) = &cfg.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    if let (Some(access_key), Some(secret_key)) = (&cfg.access_key, &cfg.secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key.as_str(),
            secret_key.as_str(),
            None,
            None,
            "static",
        ));
    }

    let shared = loader.load().await;
    info!(
        region = %cfg.region,
        endpoint = cfg.endpoint.as_deref().unwrap_or("default"),
        users_table = %cfg.users_table,
        journals_table = %cfg.journals_table,
        "dynamodb client configured"
    );
    Client::new(&shared)
}

pub fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

pub fn get_s(item: &Item, key: &str) -> Result<String, StoreError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| StoreError::Corrupt(format!("missing string attribute `{key}`")))
}

pub fn get_opt_s(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

pub fn timestamp(value: OffsetDateTime) -> Result<AttributeValue, StoreError> {
    value
        .format(&Rfc3339)
        .map(AttributeValue::S)
        .map_err(|e| StoreError::Corrupt(format!("unformattable timestamp: {e}")))
}

pub fn get_timestamp(item: &Item, key: &str) -> Result<OffsetDateTime, StoreError> {
    let raw = get_s(item, key)?;
    OffsetDateTime::parse(&raw, &Rfc3339)
        .map_err(|e| StoreError::Corrupt(format!("`{key}` is not RFC 3339: {e}")))
}

pub fn string_list(values: &[String]) -> AttributeValue {
    AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect())
}

/// Reads a list of strings, accepting either `L` of `S` or a string set.
pub fn get_string_list(item: &Item, key: &str) -> Result<Vec<String>, StoreError> {
    match item.get(key) {
        None | Some(AttributeValue::Null(_)) => Ok(Vec::new()),
        Some(AttributeValue::Ss(values)) => Ok(values.clone()),
        Some(AttributeValue::L(values)) => values
            .iter()
            .map(|v| {
                v.as_s()
                    .cloned()
                    .map_err(|_| StoreError::Corrupt(format!("non-string element in `{key}`")))
            })
            .collect(),
        Some(_) => Err(StoreError::Corrupt(format!("`{key}` is not a list"))),
    }
}

pub fn json_to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(json_to_attr).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_attr(v)))
                .collect(),
        ),
    }
}

pub fn attr_to_json(attr: &AttributeValue) -> Result<Value, StoreError> {
    let value = match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n)?,
        AttributeValue::Ss(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AttributeValue::L(values) => Value::Array(
            values
                .iter()
                .map(attr_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AttributeValue::M(map) => Value::Object(attr_map_to_json(map)?),
        _ => return Err(StoreError::Corrupt("unsupported attribute type".into())),
    };
    Ok(value)
}

pub fn attr_map_to_json(map: &Item) -> Result<Map<String, Value>, StoreError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), attr_to_json(v)?)))
        .collect()
}

fn parse_number(n: &str) -> Result<Value, StoreError> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Value::Number(i.into()));
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(Value::Number(u.into()));
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StoreError::Corrupt(format!("invalid number `{n}`")))
}
