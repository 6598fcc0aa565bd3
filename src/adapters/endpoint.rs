//! Newline-delimited JSON prediction endpoint.
//!
//! One request object per input line, one response object per output line,
//! in order. A line is either a prediction request
//!
//! ```json
//! {"phq_total": 20, "gad_total": 15, "k10_total": 40, "phq_item9": 3, "asq_any_yes": true}
//! ```
//!
//! optionally with `"assess": true` to add the survey banding and
//! `"soften": true` to keep displayed percentages off exactly 0 and 100, or
//! the command `{"command": "model_info"}`. Failures are answered with
//! `{"error": {"kind": ..., "message": ...}}` and never end the session.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{InferenceError, InferenceService};
use crate::domain::{assess, FeatureVector, RiskPrediction, SurveyAssessment, DEFAULT_SOFTEN_EPS};
use crate::ports::ModelStore;

#[derive(Debug, Deserialize)]
struct PredictRequest {
    #[serde(flatten)]
    features: FeatureVector,
    #[serde(default)]
    assess: bool,
    #[serde(default)]
    soften: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Command {
    ModelInfo,
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    command: Command,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    #[serde(flatten)]
    prediction: RiskPrediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    assessment: Option<SurveyAssessment>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    kind: &'static str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error: ErrorBody<'a>,
}

/// Counters for one serving session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub requests: u64,
    pub errors: u64,
}

fn error_response(err: &InferenceError) -> crate::Result<String> {
    let message = err.to_string();
    Ok(serde_json::to_string(&ErrorResponse {
        error: ErrorBody {
            kind: err.kind(),
            message: &message,
        },
    })?)
}

fn invalid(message: impl std::fmt::Display) -> InferenceError {
    InferenceError::InvalidRequest(message.to_string())
}

fn dispatch<S: ModelStore + ?Sized>(
    service: &InferenceService,
    store: &S,
    line: &str,
) -> crate::Result<std::result::Result<String, InferenceError>> {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Ok(Err(invalid(format_args!("malformed JSON: {e}")))),
    };

    if value.get("command").is_some() {
        return match serde_json::from_value::<CommandRequest>(value) {
            Ok(CommandRequest {
                command: Command::ModelInfo,
            }) => Ok(Ok(serde_json::to_string(&service.model_info(store))?)),
            Err(e) => Ok(Err(invalid(format_args!("unknown command: {e}")))),
        };
    }

    let request: PredictRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => return Ok(Err(invalid(e))),
    };
    let prediction = match service.predict(&request.features) {
        Ok(p) => p,
        Err(e) => return Ok(Err(e)),
    };
    let prediction = if request.soften {
        prediction.softened(DEFAULT_SOFTEN_EPS)
    } else {
        prediction
    };
    let response = PredictResponse {
        prediction,
        assessment: request.assess.then(|| assess(&request.features)),
    };
    Ok(Ok(serde_json::to_string(&response)?))
}

/// Answer one request line.
///
/// Returns the response line and whether it is an error response.
///
/// # Errors
/// Only if a response cannot be serialized.
pub fn handle_line<S: ModelStore + ?Sized>(
    service: &InferenceService,
    store: &S,
    line: &str,
) -> crate::Result<(String, bool)> {
    match dispatch(service, store, line)? {
        Ok(body) => Ok((body, false)),
        Err(e) => {
            match &e {
                InferenceError::InvalidRequest(msg) => tracing::warn!("Rejected request: {msg}"),
                other => tracing::debug!("Request refused: {other}"),
            }
            Ok((error_response(&e)?, true))
        }
    }
}

/// Serve requests from `input` until end of stream.
///
/// # Errors
/// Returns error on I/O failure of either stream.
pub fn serve<S, R, W>(
    service: &InferenceService,
    store: &S,
    input: R,
    mut output: W,
) -> crate::Result<ServeStats>
where
    S: ModelStore + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut stats = ServeStats::default();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (response, is_error) = handle_line(service, store, &line)?;
        stats.requests += 1;
        if is_error {
            stats.errors += 1;
        }
        output.write_all(response.as_bytes())?;
        output.write_all(b"\n")?;
        output.flush()?;
    }
    Ok(stats)
}
