#![forbid(unsafe_code)]

use std::sync::{LazyLock, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sf_core::{BusinessProcess, DialectConfig, Diagnostic, DiagnosticCounts, Locale, UuidGenerator};
use sf_export::export_with;
use sf_parser::{ParseResult, SAMPLE_MARKDOWN, parse_with};
use sf_validate::validate;
use wasm_bindgen::JsValue;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::wasm_bindgen;

#[derive(Debug, Clone, Default)]
struct RuntimeConfig {
    dialect: DialectConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RuntimeInitConfig {
    locale: Option<Locale>,
    dialect: DialectOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DialectOverrides {
    untitled_title: Option<String>,
    unassigned_lane: Option<String>,
    empty_rows: Option<String>,
    palette: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutput {
    pub valid: bool,
    pub counts: DiagnosticCounts,
    pub diagnostics: Vec<Diagnostic>,
}

static RUNTIME_CONFIG: LazyLock<RwLock<RuntimeConfig>> =
    LazyLock::new(|| RwLock::new(RuntimeConfig::default()));

fn read_runtime_config() -> RuntimeConfig {
    match RUNTIME_CONFIG.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn write_runtime_config(config: RuntimeConfig) {
    match RUNTIME_CONFIG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => {
            let mut guard = poisoned.into_inner();
            *guard = config;
        }
    }
}

fn js_error(message: impl Into<String>) -> JsValue {
    JsValue::from_str(&message.into())
}

fn parse_js_value_or_default<T>(value: Option<JsValue>) -> Result<T, JsValue>
where
    T: DeserializeOwned + Default,
{
    match value {
        None => Ok(T::default()),
        Some(raw) if raw.is_undefined() || raw.is_null() => Ok(T::default()),
        Some(raw) => from_js_value(raw, "config"),
    }
}

fn from_js_value<T>(value: JsValue, what: &str) -> Result<T, JsValue>
where
    T: DeserializeOwned,
{
    #[cfg(target_arch = "wasm32")]
    {
        serde_wasm_bindgen::from_value(value)
            .map_err(|err| js_error(format!("invalid {what}: {err}")))
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let json = value
            .as_string()
            .ok_or_else(|| js_error(format!("invalid {what}: expected a JSON string")))?;
        serde_json::from_str(&json).map_err(|err| js_error(format!("invalid {what}: {err}")))
    }
}

fn to_js_value<T>(value: &T) -> Result<JsValue, JsValue>
where
    T: Serialize,
{
    #[cfg(target_arch = "wasm32")]
    {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        value
            .serialize(&serializer)
            .map_err(|err| js_error(format!("failed to serialize response: {err}")))
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        serde_json::to_string(value)
            .map(|json| JsValue::from_str(&json))
            .map_err(|err| js_error(format!("failed to serialize response: {err}")))
    }
}

fn merge_dialect(base: &DialectConfig, init: RuntimeInitConfig) -> DialectConfig {
    let mut merged = match init.locale {
        Some(locale) => DialectConfig {
            palette: base.palette.clone(),
            ..DialectConfig::for_locale(locale)
        },
        None => base.clone(),
    };
    let overrides = init.dialect;

    if let Some(value) = overrides.untitled_title {
        merged.untitled_title = value;
    }
    if let Some(value) = overrides.unassigned_lane {
        merged.unassigned_lane = value;
    }
    if let Some(value) = overrides.empty_rows {
        merged.empty_rows = value;
    }
    if let Some(value) = overrides.palette {
        merged.palette = value;
    }

    merged
}

/// Parses with the runtime dialect and random ids.
#[must_use]
pub fn parse_markdown(input: &str) -> ParseResult {
    let runtime = read_runtime_config();
    parse_with(input, &runtime.dialect, &mut UuidGenerator)
}

#[must_use]
pub fn export_markdown(process: &BusinessProcess) -> String {
    export_with(process, &read_runtime_config().dialect)
}

#[must_use]
pub fn validation_output(process: &BusinessProcess) -> ValidationOutput {
    let report = validate(process);
    ValidationOutput {
        valid: report.is_valid(false),
        counts: report.counts(),
        diagnostics: report.diagnostics,
    }
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn init(config: Option<JsValue>) -> Result<(), JsValue> {
    let init: RuntimeInitConfig = parse_js_value_or_default(config)?;
    let current = read_runtime_config();
    write_runtime_config(RuntimeConfig {
        dialect: merge_dialect(&current.dialect, init),
    });
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(js_name = parseProcessMarkdown))]
pub fn parse_process_markdown_js(input: &str) -> Result<JsValue, JsValue> {
    to_js_value(&parse_markdown(input).process)
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(js_name = parseWithDiagnostics))]
pub fn parse_with_diagnostics_js(input: &str) -> Result<JsValue, JsValue> {
    to_js_value(&parse_markdown(input))
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(js_name = exportProcessToMarkdown))]
pub fn export_process_to_markdown_js(process: JsValue) -> Result<String, JsValue> {
    let process: BusinessProcess = from_js_value(process, "process")?;
    Ok(export_markdown(&process))
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(js_name = validateProcess))]
pub fn validate_process_js(process: JsValue) -> Result<JsValue, JsValue> {
    let process: BusinessProcess = from_js_value(process, "process")?;
    to_js_value(&validation_output(&process))
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(js_name = sampleMarkdown))]
#[must_use]
pub fn sample_markdown_js() -> String {
    SAMPLE_MARKDOWN.to_string()
}
