use std::collections::BTreeMap;

use qd_core::{DramaError, ErrorKind, LineUnit, RECORD_FIELDS};
use serde_json::Value as JsonValue;

use crate::CompileOutput;

const LINE_KINDS: &[&str] = &["text", "speech", "directive", "record"];

/// Loads a structured script: either the tagged form written by `script_to_json`, or the
/// loose hand-written form (`"text"`, `["Role", "text"]`, `{"Role": "text"}`,
/// `{"field": "value", ...}`), as a bare array or under a `lines` key.
pub fn load_json_script(text: &str) -> Result<CompileOutput, DramaError> {
    let value = serde_json::from_str::<JsonValue>(text).map_err(|error| {
        DramaError::new(
            ErrorKind::InvalidScript,
            format!("Failed to parse JSON script: {}", error),
        )
    })?;

    let items = match value {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut object) => match object.remove("lines") {
            Some(JsonValue::Array(items)) => items,
            _ => {
                return Err(DramaError::new(
                    ErrorKind::InvalidScript,
                    "JSON script object must carry a \"lines\" array.",
                ))
            }
        },
        other => {
            return Err(DramaError::new(
                ErrorKind::InvalidScript,
                format!("JSON script must be an array, got {}.", json_type_name(&other)),
            ))
        }
    };

    let mut output = CompileOutput::default();
    for (index, item) in items.into_iter().enumerate() {
        match line_unit_from_json(item) {
            Ok(unit) => output.script.push(unit),
            Err(message) => output.report(DramaError::with_line(
                ErrorKind::MalformedLine,
                message,
                index + 1,
            )),
        }
    }
    Ok(output)
}

fn line_unit_from_json(item: JsonValue) -> Result<LineUnit, String> {
    match item {
        JsonValue::String(content) => Ok(LineUnit::text(content)),
        JsonValue::Array(values) => match values.as_slice() {
            [JsonValue::String(role), JsonValue::String(content)] => {
                Ok(speech_or_text(role.clone(), content.clone()))
            }
            _ => Err("Array lines must be [role, text] string pairs.".to_string()),
        },
        JsonValue::Object(object) => {
            if object
                .get("kind")
                .and_then(JsonValue::as_str)
                .is_some_and(|kind| LINE_KINDS.contains(&kind))
            {
                return serde_json::from_value::<LineUnit>(JsonValue::Object(object))
                    .map_err(|error| format!("Invalid tagged line: {}", error));
            }

            if object.len() == 1 {
                if let Some((key, JsonValue::String(content))) = object.iter().next() {
                    if !RECORD_FIELDS.contains(&key.as_str()) {
                        return Ok(speech_or_text(key.clone(), content.clone()));
                    }
                }
            }

            let mut fields = BTreeMap::new();
            for (key, value) in object {
                let value = match value {
                    JsonValue::String(value) => value,
                    JsonValue::Number(number) => number.to_string(),
                    JsonValue::Bool(flag) => flag.to_string(),
                    other => {
                        return Err(format!(
                            "Field \"{}\" must be a string, got {}.",
                            key,
                            json_type_name(&other)
                        ))
                    }
                };
                fields.insert(key, value);
            }
            if !fields.contains_key("text") {
                return Err("Structured line has no \"text\" field.".to_string());
            }
            Ok(LineUnit::Record { fields })
        }
        other => Err(format!(
            "Unsupported line of type {}.",
            json_type_name(&other)
        )),
    }
}

fn speech_or_text(role: String, content: String) -> LineUnit {
    if role.is_empty() {
        LineUnit::text(content)
    } else {
        LineUnit::speech(role, content)
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
