//! # Schema Validation
//!
//! Validates a parsed manifest value against the embedded
//! `manifest.schema.json` (Draft 2020-12), then applies the refinements a
//! schema language cannot express, and finally deserializes into the typed
//! [`Manifest`].
//!
//! ## Collect-All Policy
//!
//! Shape violations and refinement violations are gathered into one
//! [`SchemaErrors`] set. Refinements run on the raw value, so a manifest with
//! a bad phase in one module and a missing install step in another reports
//! both in the same pass.
//!
//! ## Field Paths
//!
//! `jsonschema` reports JSON Pointers (`/modules/3/phase`). They are rendered
//! dotted, with the module index replaced by the module's id when it has one
//! (`modules.lang.bun.phase`).

use acfs_core::Category;
use jsonschema::{Retrieve, Uri, Validator};
use serde_json::Value;

use crate::error::{ManifestError, SchemaError, SchemaErrors};
use crate::model::Manifest;

/// The manifest schema, compiled into the binary.
pub const MANIFEST_SCHEMA: &str = include_str!("../schemas/manifest.schema.json");

/// Refuses every external `$ref`. The manifest schema only uses internal
/// `#/$defs/...` references, and the compiler performs no network I/O.
struct OfflineRetriever;

impl Retrieve for OfflineRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("external schema retrieval is disabled: {}", uri.as_str()).into())
    }
}

/// Compiled manifest validator.
pub struct ManifestValidator {
    validator: Validator,
}

impl std::fmt::Debug for ManifestValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestValidator").finish_non_exhaustive()
    }
}

impl ManifestValidator {
    /// Compile the embedded schema.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::SchemaBuild` if the embedded schema is not
    /// valid JSON or does not compile, which indicates a broken build.
    pub fn new() -> Result<Self, ManifestError> {
        let schema: Value = serde_json::from_str(MANIFEST_SCHEMA)
            .map_err(|e| ManifestError::SchemaBuild(e.to_string()))?;
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        opts.with_retriever(OfflineRetriever);
        let validator = opts
            .build(&schema)
            .map_err(|e| ManifestError::SchemaBuild(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Validate a parsed manifest value and produce the typed manifest.
    ///
    /// # Errors
    ///
    /// Returns every shape and refinement violation found.
    pub fn validate(&self, instance: &Value) -> Result<Manifest, SchemaErrors> {
        let mut errors: Vec<SchemaError> = self
            .validator
            .iter_errors(instance)
            .map(|e| SchemaError {
                path: dotted_path(&e.instance_path.to_string(), instance),
                message: e.to_string(),
            })
            .collect();

        errors.extend(refinements(instance));

        if !errors.is_empty() {
            tracing::debug!(violations = errors.len(), "manifest failed schema validation");
            return Err(SchemaErrors::new(errors));
        }

        serde_json::from_value::<Manifest>(instance.clone())
            .map_err(|e| SchemaErrors::new(vec![SchemaError::new("", e.to_string())]))
    }
}

/// Cross-field rules evaluated on the raw value.
///
/// - A generated module needs at least one non-blank install step, a
///   verified installer, or `generated: false`. A placeholder-only module
///   passes here and gets an advisory from graph validation.
/// - Verify steps must not be blank (the schema only rejects empty strings).
/// - The effective category (explicit, else the id's first segment) must not
///   be reserved.
fn refinements(instance: &Value) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let Some(modules) = instance.get("modules").and_then(Value::as_array) else {
        return errors;
    };

    for (index, module) in modules.iter().enumerate() {
        let Some(obj) = module.as_object() else {
            continue;
        };
        let prefix = module_prefix(index, module);

        let has_install_step = obj
            .get("install")
            .and_then(Value::as_array)
            .is_some_and(|steps| {
                steps
                    .iter()
                    .any(|s| s.as_str().is_some_and(|s| !s.trim().is_empty()))
            });
        let has_installer = obj.get("verified_installer").is_some_and(Value::is_object);
        let non_generated = obj.get("generated") == Some(&Value::Bool(false));

        if !has_install_step && !has_installer && !non_generated {
            errors.push(SchemaError::new(
                format!("{prefix}.install"),
                "module must declare at least one install step, a verified_installer, \
                 or generated: false",
            ));
        }

        let category = obj.get("category").and_then(Value::as_str).or_else(|| {
            obj.get("id")
                .and_then(Value::as_str)
                .and_then(|id| id.split('.').next())
        });
        if let Some(name) = category.filter(|name| Category::is_reserved_name(name)) {
            errors.push(SchemaError::new(
                format!("{prefix}.category"),
                format!("category '{name}' is reserved: install_{name}.sh is the master installer"),
            ));
        }

        if let Some(steps) = obj.get("verify").and_then(Value::as_array) {
            for (i, step) in steps.iter().enumerate() {
                if step.as_str().is_some_and(|s| !s.is_empty() && s.trim().is_empty()) {
                    errors.push(SchemaError::new(
                        format!("{prefix}.verify.{i}"),
                        "verify step is blank",
                    ));
                }
            }
        }
    }
    errors
}

/// `modules.<id>` when the module has a string id, else `modules.<index>`.
fn module_prefix(index: usize, module: &Value) -> String {
    match module.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => format!("modules.{id}"),
        _ => format!("modules.{index}"),
    }
}

/// Render a JSON Pointer as a dotted path, substituting module ids.
fn dotted_path(pointer: &str, instance: &Value) -> String {
    let segments: Vec<String> = pointer
        .split('/')
        .skip(1)
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect();

    let mut rendered: Vec<String> = Vec::with_capacity(segments.len());
    for (pos, segment) in segments.iter().enumerate() {
        if pos == 1 && segments.first().is_some_and(|s| s == "modules") {
            if let Ok(index) = segment.parse::<usize>() {
                let module = instance.get("modules").and_then(|m| m.get(index));
                if let Some(id) = module.and_then(|m| m.get("id")).and_then(Value::as_str) {
                    if !id.is_empty() {
                        rendered.push(id.to_string());
                        continue;
                    }
                }
            }
        }
        rendered.push(segment.clone());
    }
    rendered.join(".")
}
