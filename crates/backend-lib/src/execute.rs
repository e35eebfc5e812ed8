// ============================
// crates/backend-lib/src/execute.rs
// ============================
//! Execution gateway: the external collaborator that turns
//! `(code, language)` into a structured result record.
//!
//! The room actor never awaits a gateway call on its mailbox; requests
//! run as independent tasks and their results re-enter the room's event
//! stream, so a hung gateway stalls only its own request.

use async_trait::async_trait;
use boa_engine::{Context, Source};
use coderoom_common::ExecutionResult;
use serde::Deserialize;
use std::time::Instant;

/// Contract for running a snippet of code in some language.
///
/// Implementations must capture runtime failures and return them as a
/// `success: false` result instead of propagating an error; the result
/// record is the only user-visible error channel.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn execute(&self, code: &str, language: &str) -> ExecutionResult;
}

/// Gateway used when no language runtime is wired in. Every request is
/// answered with the explanatory fallback the UI expects, timed like a
/// real run.
pub struct DefaultGateway;

#[async_trait]
impl ExecutionGateway for DefaultGateway {
    async fn execute(&self, _code: &str, language: &str) -> ExecutionResult {
        let start = Instant::now();
        let output = format!(
            "Code execution for {language} is not implemented yet.\n\
             This would require a sandboxed execution environment."
        );
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        ExecutionResult::completed(output, elapsed_ms)
    }
}

/// Gateway that interprets JavaScript with an embedded engine and falls
/// back to [`DefaultGateway`] for every other language.
///
/// Each request gets a fresh engine context on a blocking thread, so
/// scripts share no state and a long-running script never blocks the
/// runtime's async workers. `console.log` output lines are joined with
/// newlines; thrown values come back as a `success: false` result with
/// the error text and, when present, the stack.
pub struct JsGateway {
    loop_limit: u64,
}

impl JsGateway {
    pub fn new() -> Self {
        JsGateway {
            loop_limit: 10_000_000,
        }
    }
}

impl Default for JsGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionGateway for JsGateway {
    async fn execute(&self, code: &str, language: &str) -> ExecutionResult {
        if !language.eq_ignore_ascii_case("javascript") {
            return DefaultGateway.execute(code, language).await;
        }

        let start = Instant::now();
        let code = code.to_string();
        let loop_limit = self.loop_limit;
        let outcome = tokio::task::spawn_blocking(move || run_js(&code, loop_limit)).await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(JsOutcome::Completed { output }) => ExecutionResult::completed(output, elapsed_ms),
            Ok(JsOutcome::Threw { error, stack }) => ExecutionResult::failed(error, stack),
            Err(e) => ExecutionResult::failed(format!("execution task failed: {e}"), String::new()),
        }
    }
}

enum JsOutcome {
    Completed { output: String },
    Threw { error: String, stack: String },
}

/// What the in-engine harness reports back, as one JSON string.
#[derive(Deserialize)]
struct HarnessReport {
    ok: bool,
    #[serde(default)]
    output: String,
    #[serde(default)]
    error: String,
    #[serde(default)]
    stack: String,
}

fn run_js(code: &str, loop_limit: u64) -> JsOutcome {
    // The user code is embedded as a string literal and evaluated inside
    // a harness that shadows `console` with a capturing stub; runtime
    // throws (including syntax errors in the user code) are caught there
    // and reported in-band, so only harness-level failures surface as
    // engine errors.
    let Ok(literal) = serde_json::to_string(code) else {
        return JsOutcome::Threw {
            error: "failed to encode source".to_string(),
            stack: String::new(),
        };
    };
    let harness = format!(
        r#"(() => {{
            const __lines = [];
            const __fmt = (v) => {{
                if (typeof v === 'object' && v !== null) {{
                    try {{ return JSON.stringify(v); }} catch (_) {{ return String(v); }}
                }}
                return String(v);
            }};
            const console = {{ log: (...args) => {{ __lines.push(args.map(__fmt).join(' ')); }} }};
            console.info = console.warn = console.error = console.log;
            try {{
                eval({literal});
                return JSON.stringify({{ ok: true, output: __lines.join('\n') }});
            }} catch (e) {{
                return JSON.stringify({{
                    ok: false,
                    error: String(e),
                    stack: e && e.stack ? String(e.stack) : ''
                }});
            }}
        }})()"#
    );

    let mut context = Context::default();
    context.runtime_limits_mut().set_loop_iteration_limit(loop_limit);
    match context.eval(Source::from_bytes(&harness)) {
        Ok(value) => {
            let report = value
                .to_string(&mut context)
                .map(|s| s.to_std_string_escaped())
                .ok()
                .and_then(|s| serde_json::from_str::<HarnessReport>(&s).ok());
            match report {
                Some(report) if report.ok => JsOutcome::Completed {
                    output: report.output,
                },
                Some(report) => JsOutcome::Threw {
                    error: report.error,
                    stack: report.stack,
                },
                None => JsOutcome::Threw {
                    error: "malformed execution report".to_string(),
                    stack: String::new(),
                },
            }
        }
        // loop-limit aborts and other uncatchable engine errors
        Err(e) => JsOutcome::Threw {
            error: e.to_string(),
            stack: String::new(),
        },
    }
}
