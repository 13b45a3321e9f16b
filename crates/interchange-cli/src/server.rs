use anyhow::Result;
use interchange_core::{
    EntryHash, InterchangeConfig, InterchangeEntry, InterchangeError, Interpreter, StoreError,
};
use interchange_proto::{
    codes, methods, CheckResult, CreateEntryParams, EntryRecord, EntryRef, ErrorObject,
    ErrorResponse, Request, Response, TestOutputParams,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::io::{self, BufRead};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

pub fn run(config: InterchangeConfig) -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
            &config.logging.level,
        ))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let rt = Runtime::new()?;
    let interpreter = rt.block_on(Interpreter::from_config(config))?;
    tracing::debug!("Serving interchange requests on stdio");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response_json = rt.block_on(handle_line(&interpreter, &line))?;
        println!("{}", response_json);
    }
    Ok(())
}

/// Answer one request line with one response line.
pub async fn handle_line(interpreter: &Interpreter, line: &str) -> Result<String> {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            let error = ErrorObject {
                code: codes::PARSE_ERROR,
                message: "Parse error".to_string(),
                data: Some(Value::String(e.to_string())),
            };
            return Ok(serde_json::to_string(&ErrorResponse { id: 0, error })?);
        }
    };

    let id = request.id;
    let response_json = match dispatch(interpreter, request).await {
        Ok(result) => serde_json::to_string(&Response { id, result })?,
        Err(error) => serde_json::to_string(&ErrorResponse { id, error })?,
    };
    Ok(response_json)
}

async fn dispatch(interpreter: &Interpreter, request: Request) -> Result<Value, ErrorObject> {
    match request.method.as_str() {
        methods::TEST_OUTPUT => {
            let params: TestOutputParams = params(request.params)?;
            Ok(Value::Bool(interpreter.test_output(&params.params_string)))
        }
        methods::CHECK => {
            let params: TestOutputParams = params(request.params)?;
            let result = match interpreter.check(&params.params_string) {
                Ok(expr) => CheckResult {
                    accepted: true,
                    canonical: Some(expr.to_string()),
                    error: None,
                    stage: None,
                },
                Err(e) => CheckResult {
                    accepted: false,
                    canonical: None,
                    error: Some(e.to_string()),
                    stage: Some(e.rejected_at().to_string()),
                },
            };
            to_value(result)
        }
        methods::CREATE_INTERCHANGE_ENTRY_PARSE => {
            let params: CreateEntryParams = params(request.params)?;
            let args = params
                .args
                .iter()
                .map(|arg| parse_hash(arg))
                .collect::<Result<Vec<_>, _>>()?;
            let hash = interpreter
                .create_interchange_entry_parse(&params.expr, &args)
                .await
                .map_err(pipeline_error)?;
            Ok(Value::String(hash.to_string()))
        }
        methods::GET_INTERCHANGE_ENTRY => {
            let entry_ref: EntryRef = params(request.params)?;
            let hash = parse_hash(entry_ref.hash())?;
            let entry = interpreter
                .get_interchange_entry(&hash)
                .await
                .map_err(pipeline_error)?;
            record(hash, entry)
        }
        methods::AWAIT_INTERCHANGE_ENTRY => {
            let entry_ref: EntryRef = params(request.params)?;
            let hash = parse_hash(entry_ref.hash())?;
            let entry = interpreter
                .await_interchange_entry(&hash)
                .await
                .map_err(pipeline_error)?;
            record(hash, entry)
        }
        methods::LIST_INTERCHANGE_ENTRIES => {
            let hashes = interpreter
                .list_interchange_entries()
                .await
                .map_err(pipeline_error)?;
            Ok(Value::Array(
                hashes
                    .iter()
                    .map(|hash| Value::String(hash.to_string()))
                    .collect(),
            ))
        }
        _ => Err(ErrorObject {
            code: codes::METHOD_NOT_FOUND,
            message: "Method not found".to_string(),
            data: None,
        }),
    }
}

fn params<T: DeserializeOwned>(value: Value) -> Result<T, ErrorObject> {
    serde_json::from_value(value).map_err(|e| invalid_params(e.to_string()))
}

fn parse_hash(text: &str) -> Result<EntryHash, ErrorObject> {
    text.parse()
        .map_err(|e| invalid_params(format!("{}: {}", text, e)))
}

fn invalid_params(detail: String) -> ErrorObject {
    ErrorObject {
        code: codes::INVALID_PARAMS,
        message: "Invalid params".to_string(),
        data: Some(Value::String(detail)),
    }
}

fn internal_error(detail: String) -> ErrorObject {
    ErrorObject {
        code: codes::INTERNAL_ERROR,
        message: "Internal error".to_string(),
        data: Some(Value::String(detail)),
    }
}

fn pipeline_error(error: InterchangeError) -> ErrorObject {
    match &error {
        InterchangeError::Store(StoreError::NotFound(_)) => ErrorObject {
            code: codes::NOT_FOUND,
            message: error.to_string(),
            data: None,
        },
        InterchangeError::Store(_) => internal_error(error.to_string()),
        InterchangeError::Parse(_)
        | InterchangeError::Validation(_)
        | InterchangeError::MissingOperand(_) => ErrorObject {
            code: codes::REJECTED,
            message: error.to_string(),
            data: Some(json!({ "stage": error.rejected_at().to_string() })),
        },
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, ErrorObject> {
    serde_json::to_value(value).map_err(|e| internal_error(e.to_string()))
}

fn record(hash: EntryHash, entry: InterchangeEntry) -> Result<Value, ErrorObject> {
    to_value(EntryRecord {
        hash: hash.to_string(),
        operator: entry.operator,
        parsed: to_value(&entry.parsed)?,
        operands: entry.operands.iter().map(|h| h.to_string()).collect(),
    })
}

/// Directives from `RUST_LOG` when set, otherwise the configured level.
fn log_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}
