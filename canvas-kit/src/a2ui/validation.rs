//! Structural validation of untrusted A2UI input.
//!
//! Validation is shallow: the envelope, ids and component tags are
//! checked; kind-specific component fields are not. [`parse_message`] is the
//! boundary function that turns an arbitrary JSON value into a typed
//! [`A2uiMessage`].

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::component::{A2uiComponent, ComponentType};
use super::message::{A2uiMessage, MessageType};
use super::pointer::{MAX_POINTER_DEPTH, pointer_depth};

/// Outcome of validating a value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        ValidationResult {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn from_errors(errors: Vec<String>) -> Self {
        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self::from_errors(vec![message.into()])
    }

    /// Convert into a `Result`, keeping the error list on failure.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.valid {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }
}

/// Rejected input, with every reason found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid A2UI input: {}", errors.join("; "))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

/// Validate an A2UI envelope.
///
/// Only the first key of the object is inspected; extra keys are ignored.
pub fn validate_message(value: &Value) -> ValidationResult {
    let Some(obj) = value.as_object() else {
        return ValidationResult::err("Message must be a non-null object");
    };
    let Some((tag, payload)) = obj.iter().next() else {
        return ValidationResult::err("Message must have exactly one key");
    };
    let Some(p) = payload.as_object() else {
        return ValidationResult::err(format!("Message payload for \"{tag}\" must be an object"));
    };

    let kind = MessageType::from_tag(tag);
    if kind == MessageType::Unknown {
        return ValidationResult::err(format!("Unknown message type: {tag}"));
    }
    if !p.get("surfaceId").is_some_and(Value::is_string) {
        return ValidationResult::err(format!("{tag}.surfaceId must be a string"));
    }

    match kind {
        MessageType::CreateSurface | MessageType::DestroySurface => ValidationResult::ok(),
        MessageType::UpdateDataModel => check_path(tag, p),
        MessageType::UpdateComponents => match p.get("components") {
            Some(Value::Array(components)) => validate_components(components),
            _ => ValidationResult::err("updateComponents.components must be an array"),
        },
        MessageType::RemoveComponents => match p.get("componentIds") {
            Some(Value::Array(_)) => ValidationResult::ok(),
            _ => ValidationResult::err("removeComponents.componentIds must be an array"),
        },
        MessageType::AppendData => {
            let path = check_path(tag, p);
            if !path.valid {
                return path;
            }
            match p.get("items") {
                Some(Value::Array(_)) => ValidationResult::ok(),
                _ => ValidationResult::err("appendData.items must be an array"),
            }
        }
        MessageType::PatchDataModel => match p.get("patch") {
            Some(Value::Object(_)) => ValidationResult::ok(),
            _ => ValidationResult::err("patchDataModel.patch must be an object"),
        },
        MessageType::Unknown => ValidationResult::err(format!("Unknown message type: {tag}")),
    }
}

fn check_path(tag: &str, payload: &Map<String, Value>) -> ValidationResult {
    match payload.get("path") {
        Some(Value::String(path)) if pointer_depth(path) > MAX_POINTER_DEPTH => {
            ValidationResult::err(format!("{tag}.path must have at most {MAX_POINTER_DEPTH} segments"))
        }
        Some(Value::String(path)) if path.is_empty() || path.starts_with('/') => {
            ValidationResult::ok()
        }
        Some(Value::String(_)) => {
            ValidationResult::err(format!("{tag}.path must be a JSON Pointer (start with /)"))
        }
        _ => ValidationResult::err(format!("{tag}.path must be a string")),
    }
}

fn validate_components(components: &[Value]) -> ValidationResult {
    let mut errors = Vec::new();

    for (i, c) in components.iter().enumerate() {
        let Some(comp) = c.as_object() else {
            errors.push(format!("components[{i}]: must be an object"));
            continue;
        };
        if !comp.get("id").is_some_and(Value::is_string) {
            errors.push(format!("components[{i}]: id must be a string"));
        }
        match comp.get("component") {
            Some(Value::String(tag)) if ComponentType::from_name(tag).is_none() => {
                errors.push(format!("components[{i}]: unknown component type \"{tag}\""));
            }
            Some(Value::String(_)) => {}
            _ => errors.push(format!("components[{i}]: component must be a string")),
        }
    }

    ValidationResult::from_errors(errors)
}

/// Validate a single component record
pub fn validate_component(value: &Value) -> ValidationResult {
    if !value.is_object() {
        return ValidationResult::err("Component must be a non-null object");
    }
    validate_components(std::slice::from_ref(value))
}

pub fn is_a2ui_message(value: &Value) -> bool {
    validate_message(value).valid
}

pub fn is_a2ui_component(value: &Value) -> bool {
    validate_component(value).valid
}

/// Validate `value` and build the typed message from it.
///
/// Keys after the first are dropped before deserializing, matching
/// [`validate_message`].
pub fn parse_message(value: &Value) -> Result<A2uiMessage, ValidationError> {
    validate_message(value).into_result()?;

    let envelope: Map<String, Value> = value
        .as_object()
        .and_then(|obj| obj.iter().next())
        .map(|(tag, payload)| (tag.clone(), payload.clone()))
        .into_iter()
        .collect();

    serde_json::from_value(Value::Object(envelope)).map_err(|e| ValidationError {
        errors: vec![e.to_string()],
    })
}

/// Validate `value` and build the typed component from it.
pub fn parse_component(value: &Value) -> Result<A2uiComponent, ValidationError> {
    validate_component(value).into_result()?;
    serde_json::from_value(value.clone()).map_err(|e| ValidationError {
        errors: vec![e.to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors(value: Value) -> Vec<String> {
        validate_message(&value).errors
    }

    #[test]
    fn test_envelope_shape() {
        assert_eq!(errors(json!(null)), vec!["Message must be a non-null object"]);
        assert_eq!(errors(json!("createSurface")), vec!["Message must be a non-null object"]);
        assert_eq!(errors(json!({})), vec!["Message must have exactly one key"]);
        assert_eq!(
            errors(json!({"createSurface": "s1"})),
            vec!["Message payload for \"createSurface\" must be an object"]
        );
        assert_eq!(
            errors(json!({"beginRendering": {"surfaceId": "s"}})),
            vec!["Unknown message type: beginRendering"]
        );
    }

    #[test]
    fn test_surface_id_required() {
        assert_eq!(
            errors(json!({"createSurface": {"surfaceId": 7}})),
            vec!["createSurface.surfaceId must be a string"]
        );
        assert!(is_a2ui_message(&json!({"destroySurface": {"surfaceId": "s"}})));
    }

    #[test]
    fn test_update_data_model_path() {
        let bad = json!({"updateDataModel": {"surfaceId": "s1", "path": "no-slash", "value": 1}});
        let result = validate_message(&bad);
        assert!(!result.valid);
        assert!(result.errors[0].contains("JSON Pointer"));

        let root = json!({"updateDataModel": {"surfaceId": "s1", "path": "", "value": 1}});
        assert!(validate_message(&root).valid);

        assert_eq!(
            errors(json!({"updateDataModel": {"surfaceId": "s1", "path": 3}})),
            vec!["updateDataModel.path must be a string"]
        );
    }

    #[test]
    fn test_path_depth_limit() {
        let deep = "/a".repeat(100_000);

        assert_eq!(
            errors(json!({"updateDataModel": {"surfaceId": "s1", "path": deep, "value": 1}})),
            vec!["updateDataModel.path must have at most 128 segments"]
        );
        assert_eq!(
            errors(json!({"appendData": {"surfaceId": "s1", "path": "/a".repeat(129), "items": []}})),
            vec!["appendData.path must have at most 128 segments"]
        );
        assert!(is_a2ui_message(
            &json!({"updateDataModel": {"surfaceId": "s1", "path": "/a".repeat(128), "value": 1}})
        ));
    }

    #[test]
    fn test_append_data() {
        assert!(is_a2ui_message(&json!({"appendData": {"surfaceId": "s", "path": "/e", "items": []}})));
        assert_eq!(
            errors(json!({"appendData": {"surfaceId": "s", "path": "e", "items": []}})),
            vec!["appendData.path must be a JSON Pointer (start with /)"]
        );
        assert_eq!(
            errors(json!({"appendData": {"surfaceId": "s", "path": "/e", "items": {}}})),
            vec!["appendData.items must be an array"]
        );
    }

    #[test]
    fn test_patch_must_be_object() {
        assert!(is_a2ui_message(&json!({"patchDataModel": {"surfaceId": "s", "patch": {}}})));
        assert_eq!(
            errors(json!({"patchDataModel": {"surfaceId": "s", "patch": [1]}})),
            vec!["patchDataModel.patch must be an object"]
        );
    }

    #[test]
    fn test_component_errors_name_index_and_tag() {
        let msg = json!({"updateComponents": {"surfaceId": "s", "components": [
            {"id": "ok", "component": "Map"},
            {"id": "bad", "component": "Button"},
            "nope",
            {"component": 5}
        ]}});

        assert_eq!(
            errors(msg),
            vec![
                "components[1]: unknown component type \"Button\"",
                "components[2]: must be an object",
                "components[3]: id must be a string",
                "components[3]: component must be a string",
            ]
        );
    }

    #[test]
    fn test_validate_component() {
        assert!(is_a2ui_component(&json!({"id": "x", "component": "Artifact", "html": "<p/>"})));
        assert_eq!(
            validate_component(&json!(null)).errors,
            vec!["Component must be a non-null object"]
        );
        assert!(!is_a2ui_component(&json!({"id": "x", "component": "Slider"})));
    }

    #[test]
    fn test_first_key_wins() {
        let value = json!({
            "destroySurface": {"surfaceId": "a"},
            "createSurface": {"surfaceId": "b"}
        });

        assert!(validate_message(&value).valid);
        let msg = parse_message(&value).unwrap();
        assert_eq!(msg.message_type(), MessageType::DestroySurface);
        assert_eq!(msg.surface_id(), "a");
    }

    #[test]
    fn test_parse_message_rejects_invalid() {
        let err = parse_message(&json!({"removeComponents": {"surfaceId": "s"}})).unwrap_err();
        assert_eq!(err.errors, vec!["removeComponents.componentIds must be an array"]);
        assert!(err.to_string().contains("componentIds"));
    }

    #[test]
    fn test_parse_component() {
        let component = parse_component(&json!({"id": "t", "component": "Timeline", "events": "/e"})).unwrap();
        assert_eq!(component.component, ComponentType::Timeline);
        assert!(parse_component(&json!({"id": "t"})).is_err());
    }
}
