//! Request handling
//!
//! One JSON object per line in, one JSON object per line out. Requests
//! name an `op` and carry its arguments alongside:
//!
//! ```text
//! {"id": 1, "op": "decode", "date": 36524, "time": 0}
//! {"id": 2, "op": "encode", "value": "2000-02-29 10:00:00.250"}
//! ```

use datewire_core::{codes, DriverError, PackedDateTime, Temporal};
use datewire_params::{
    count_parameters, create_parameter_mapping, declarations, ParameterListItem, ServerProfile,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<JsonValue>,
    pub op: String,
    #[serde(flatten)]
    pub args: Map<String, JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DriverError>,
}

impl Response {
    fn new(id: Option<JsonValue>, outcome: Result<JsonValue, DriverError>) -> Self {
        match outcome {
            Ok(result) => Self { id, result: Some(result), error: None },
            Err(error) => Self { id, result: None, error: Some(error) },
        }
    }
}

#[derive(Debug, Deserialize)]
struct DecodeArgs {
    date: i32,
    time: i32,
}

#[derive(Debug, Deserialize)]
struct DecodeSmallArgs {
    days: u16,
    minutes: u16,
}

#[derive(Debug, Deserialize)]
struct EncodeArgs {
    value: String,
}

#[derive(Debug, Deserialize)]
struct CountArgs {
    sql: String,
}

#[derive(Debug, Deserialize)]
struct DeclareArgs {
    sql: String,
    params: Vec<ParameterListItem>,
    #[serde(default)]
    profile: Option<ServerProfile>,
}

/// Parse and answer one request line
pub fn handle_line(line: &str, profile: &ServerProfile) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_request(&request, profile),
        Err(e) => {
            debug!(error = %e, "unparseable request");
            Response::new(None, Err(protocol_error(format!("Parse error: {}", e))))
        }
    }
}

pub fn handle_request(request: &Request, profile: &ServerProfile) -> Response {
    let outcome = match request.op.as_str() {
        "decode" => args(request).and_then(op_decode),
        "decode_small" => args(request).and_then(op_decode_small),
        "encode" => args(request).and_then(op_encode),
        "count_parameters" => args(request).and_then(op_count_parameters),
        "declare" => args(request).and_then(|a| op_declare(a, profile)),
        other => Err(DriverError::new(codes::NOT_IMPLEMENTED, format!("Unknown op: {}", other))
            .with_suggestion("Use decode, decode_small, encode, count_parameters or declare")),
    };
    Response::new(request.id.clone(), outcome)
}

fn protocol_error(message: String) -> DriverError {
    DriverError::new(codes::PROTOCOL_VIOLATION, message)
}

fn args<T: DeserializeOwned>(request: &Request) -> Result<T, DriverError> {
    serde_json::from_value(JsonValue::Object(request.args.clone()))
        .map_err(|e| protocol_error(format!("Invalid arguments for {}: {}", request.op, e)))
}

fn describe(value: &PackedDateTime) -> JsonValue {
    let (date, time) = value.packed().to_wire();
    json!({
        "packed": value.packed(),
        "wire": [date, time],
        "natural": value.to_natural(),
        "timestamp": value.to_timestamp(),
        "string": value.to_canonical_string(),
        "date_absent": value.is_date_absent(),
        "time_absent": value.is_time_absent(),
    })
}

fn op_decode(args: DecodeArgs) -> Result<JsonValue, DriverError> {
    match PackedDateTime::new(args.date, args.time) {
        Some(value) => Ok(describe(&value)),
        None => Ok(JsonValue::Null),
    }
}

fn op_decode_small(args: DecodeSmallArgs) -> Result<JsonValue, DriverError> {
    Ok(describe(&PackedDateTime::from_small(args.days, args.minutes)))
}

fn op_encode(args: EncodeArgs) -> Result<JsonValue, DriverError> {
    let temporal = Temporal::parse(&args.value)
        .map_err(|e| DriverError::from(e).with_value(args.value.clone()))?;
    let packed = PackedDateTime::from_temporal(&temporal)?;
    Ok(describe(&packed))
}

fn op_count_parameters(args: CountArgs) -> Result<JsonValue, DriverError> {
    Ok(json!({ "count": count_parameters(&args.sql) }))
}

fn op_declare(args: DeclareArgs, profile: &ServerProfile) -> Result<JsonValue, DriverError> {
    let DeclareArgs { sql, mut params, profile: requested } = args;
    let profile = requested.unwrap_or(*profile);

    let placeholders = count_parameters(&sql);
    if placeholders != params.len() {
        return Err(DriverError::new(
            codes::PARAMETER_NOT_SET,
            format!(
                "Statement has {} placeholders but {} parameters were given",
                placeholders,
                params.len()
            ),
        ));
    }

    create_parameter_mapping(&sql, &mut params, &profile)?;
    let declarations = declarations(&params)?;
    Ok(json!({
        "declarations": declarations,
        "params": params,
    }))
}
