//! Apps Script Execution API client.
//!
//! Used to run the add-on's in-script test runner remotely. The runner
//! returns `{log, failures}`; a script that throws comes back as an
//! `ExecutionError` with a stack trace instead.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{DeployError, DeployResult};

/// Base URL for the Apps Script API v1.
pub const SCRIPT_API_BASE: &str = "https://script.googleapis.com/v1";

/// One frame of an Apps Script stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StackFrame {
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default, rename = "lineNumber")]
    pub line_number: Option<i64>,
}

/// A script that started and then threw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    pub message: String,
    pub error_type: Option<String>,
    pub stack: Vec<StackFrame>,
}

/// Result of a `scripts.run` call that reached the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// The function returned a test report.
    Completed { log: String, failures: u64 },
    /// The function raised an error.
    ScriptError(ScriptFailure),
}

impl ScriptOutcome {
    /// Process exit code for this outcome: the failure count, capped at 255.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed { failures, .. } => u8::try_from(*failures).unwrap_or(u8::MAX),
            Self::ScriptError(_) => 1,
        }
    }
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    function: &'a str,
    parameters: Vec<Value>,
    #[serde(rename = "devMode")]
    dev_mode: bool,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    response: Option<ExecutionResponse>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct ExecutionResponse {
    #[serde(default)]
    result: Option<TestReport>,
}

#[derive(Debug, Deserialize)]
struct TestReport {
    #[serde(default)]
    log: Option<String>,
    #[serde(default)]
    failures: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Vec<ExecutionError>,
}

#[derive(Debug, Deserialize)]
struct ExecutionError {
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default, rename = "scriptStackTraceElements")]
    script_stack_trace_elements: Vec<StackFrame>,
}

/// Apps Script API client.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    http_client: reqwest::Client,
    api_base: String,
}

impl ScriptRunner {
    pub fn new(api_base: impl Into<String>, timeout: Option<Duration>) -> DeployResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| DeployError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Runs `function` (without parameters) in the script `script_id`.
    pub async fn run_function(
        &self,
        access_token: &str,
        script_id: &str,
        function: &str,
        dev_mode: bool,
    ) -> DeployResult<ScriptOutcome> {
        let url = format!(
            "{}/scripts/{}:run",
            self.api_base,
            urlencoding::encode(script_id)
        );
        let payload = serde_json::to_vec(&RunRequest {
            function,
            parameters: Vec::new(),
            dev_mode,
        })
        .map_err(|e| DeployError::ScriptApi(format!("failed to encode request: {}", e)))?;

        debug!("POST {} ({})", url, function);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| DeployError::ScriptApi(format!("request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DeployError::ScriptApi(format!("failed to read response: {}", e)))?;

        interpret_run_response(status, &body)
    }
}

/// Maps a `scripts.run` response onto an outcome.
pub fn interpret_run_response(status: u16, body: &str) -> DeployResult<ScriptOutcome> {
    let operation: Option<Operation> = serde_json::from_str(body).ok();

    if status != 200 {
        let message = operation
            .and_then(|op| op.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body.trim()));
        return Err(DeployError::ScriptApi(message));
    }

    let operation = operation
        .ok_or_else(|| DeployError::ScriptApi(format!("invalid response body: {}", body.trim())))?;

    if let Some(error) = operation.error {
        let detail = error.details.into_iter().next();
        let failure = match detail {
            Some(detail) => ScriptFailure {
                message: detail
                    .error_message
                    .or(error.message)
                    .unwrap_or_else(|| "unknown script error".to_string()),
                error_type: detail.error_type,
                stack: detail.script_stack_trace_elements,
            },
            None => ScriptFailure {
                message: error
                    .message
                    .unwrap_or_else(|| "unknown script error".to_string()),
                error_type: None,
                stack: Vec::new(),
            },
        };
        return Ok(ScriptOutcome::ScriptError(failure));
    }

    let report = operation
        .response
        .and_then(|r| r.result)
        .ok_or_else(|| DeployError::ScriptApi("response carries no result".to_string()))?;

    let failures = report.failures.ok_or_else(|| {
        DeployError::ScriptApi("result has no 'failures' count".to_string())
    })?;

    Ok(ScriptOutcome::Completed {
        log: report.log.unwrap_or_default(),
        failures: failures.max(0.0).round() as u64,
    })
}

#[cfg(test)]
mod tests {
    use addonctl_core::testing::{StubResponse, StubServer};

    use super::*;

    const COMPLETED: &str = r#"{
        "done": true,
        "response": {
            "@type": "type.googleapis.com/google.apps.script.v1.ExecutionResponse",
            "result": {"failures": 2, "log": "not ok 1 - it writes Hello\n"}
        }
    }"#;

    const THREW: &str = r#"{
        "done": true,
        "error": {
            "code": 3,
            "message": "ScriptError",
            "details": [{
                "@type": "type.googleapis.com/google.apps.script.v1.ExecutionError",
                "errorMessage": "ReferenceError: GasTap is not defined",
                "errorType": "ScriptError",
                "scriptStackTraceElements": [
                    {"function": "gastTestRunner", "lineNumber": 12},
                    {"function": "testSayHello", "lineNumber": 30}
                ]
            }]
        }
    }"#;

    #[test]
    fn completed_run() {
        let outcome = interpret_run_response(200, COMPLETED).unwrap();
        assert_eq!(
            outcome,
            ScriptOutcome::Completed {
                log: "not ok 1 - it writes Hello\n".to_string(),
                failures: 2,
            }
        );
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn script_error_keeps_stack() {
        let outcome = interpret_run_response(200, THREW).unwrap();
        let ScriptOutcome::ScriptError(failure) = &outcome else {
            panic!("expected script error, got {:?}", outcome);
        };
        assert_eq!(failure.message, "ReferenceError: GasTap is not defined");
        assert_eq!(failure.error_type.as_deref(), Some("ScriptError"));
        assert_eq!(failure.stack.len(), 2);
        assert_eq!(failure.stack[0].function.as_deref(), Some("gastTestRunner"));
        assert_eq!(failure.stack[1].line_number, Some(30));
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn api_error_is_an_error() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#;
        match interpret_run_response(404, body) {
            Err(DeployError::ScriptApi(message)) => {
                assert_eq!(message, "Requested entity was not found.")
            }
            other => panic!("expected ScriptApi, got {:?}", other),
        }
    }

    #[test]
    fn missing_result_is_an_error() {
        assert!(interpret_run_response(200, r#"{"done": true, "response": {}}"#).is_err());
        assert!(interpret_run_response(200, "garbage").is_err());
    }

    #[test]
    fn exit_code_is_capped() {
        let outcome = ScriptOutcome::Completed {
            log: String::new(),
            failures: 256,
        };
        assert_eq!(outcome.exit_code(), 255);
        let outcome = ScriptOutcome::Completed {
            log: String::new(),
            failures: 0,
        };
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn run_function_posts_request() {
        let server = StubServer::start(vec![StubResponse::json(200, COMPLETED)]).unwrap();
        let runner = ScriptRunner::new(server.url(), None).unwrap();

        let outcome = runner
            .run_function("tok", "script-1", "gastTestRunner", true)
            .await
            .unwrap();
        assert_eq!(outcome.exit_code(), 2);

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/scripts/script-1:run");
        assert_eq!(requests[0].header("authorization"), Some("Bearer tok"));
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({"function": "gastTestRunner", "parameters": [], "devMode": true})
        );
    }
}
