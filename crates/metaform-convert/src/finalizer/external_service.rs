//! External service registrations
//!
//! One output per registration, wrapping the record it was given. A record
//! that carries its API schema inline gets that schema split into a sibling
//! `<name>.yaml` or `<name>.json` file.

use super::{Finalizer, TransactionFinalizer};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::write::{WriteInfo, WriterFormat};
use async_trait::async_trait;
use indexmap::IndexMap;
use metaform_component::{MetadataComponent, META_XML_SUFFIX};
use metaform_document::{wrap_with_ns, JsonMap, Value};
use std::path::{Path, PathBuf};

/// Field holding the inline schema
const SCHEMA_FIELD: &str = "schema";

/// Field naming the schema's file format
const SCHEMA_EXTENSION_FIELD: &str = "schemaUploadFileExtension";

/// One registration ready to be written
#[derive(Debug, Clone)]
pub struct RegistrationEntry {
    /// Complete registration record (inner object, no root element)
    pub record: JsonMap,
    /// Component the record belongs to
    pub component: MetadataComponent,
}

/// Registrations keyed by full name, in arrival order
pub type ExternalServiceState = IndexMap<String, RegistrationEntry>;

/// Writes each registration, splitting out inline schemas
#[derive(Debug, Default)]
pub struct ExternalServiceRegistrationFinalizer {
    state: ExternalServiceState,
    config: ConvertConfig,
}

impl ExternalServiceRegistrationFinalizer {
    /// Create empty finalizer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With conversion config
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ConvertConfig) -> Self {
        self.config = config;
        self
    }

    /// Add the record for a registration, replacing any earlier one
    pub fn insert(&mut self, component: MetadataComponent, record: JsonMap) {
        let key = component.full_name().to_string();
        self.state.insert(key, RegistrationEntry { record, component });
    }

    fn write_infos(&self, entry: &RegistrationEntry) -> ConvertResult<Vec<WriteInfo>> {
        let component = &entry.component;
        let ty = component.type_();
        let dir = PathBuf::from(&ty.directory_name);
        let mut record = entry.record.clone();
        let mut infos = Vec::with_capacity(2);

        if let Some((extension, schema)) = split_schema(&mut record) {
            let text = render_schema(component.full_name(), &extension, &schema)?;
            infos.push(WriteInfo::text(dir.join(format!("{}.{extension}", component.full_name())), text));
        }

        let xml = dir.join(format!(
            "{}.{}{META_XML_SUFFIX}",
            component.full_name(),
            ty.suffix_or_empty()
        ));
        infos.insert(0, WriteInfo::document(xml, wrap_with_ns(&ty.name, record), self.config.codec()));
        Ok(infos)
    }
}

/// Remove an inline schema whose extension supports splitting
fn split_schema(record: &mut JsonMap) -> Option<(String, String)> {
    let extension = record
        .get(SCHEMA_EXTENSION_FIELD)
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
        .filter(|ext| ext == "yaml" || ext == "json")?;
    if !matches!(record.get(SCHEMA_FIELD), Some(Value::String(_))) {
        return None;
    }
    let Some(Value::String(schema)) = record.shift_remove(SCHEMA_FIELD) else {
        return None;
    };
    Some((extension, schema))
}

/// Schema text in the format its extension names
///
/// JSON schemas are converted when YAML is requested; anything that is not
/// JSON is written unchanged.
fn render_schema(full_name: &str, extension: &str, schema: &str) -> ConvertResult<String> {
    let Ok(parsed) = serde_json::from_str::<Value>(schema) else {
        return Ok(schema.to_string());
    };
    let schema_error = |message: String| ConvertError::Schema {
        full_name: full_name.to_string(),
        message,
    };
    if extension == "yaml" {
        serde_yaml::to_string(&parsed).map_err(|e| schema_error(e.to_string()))
    } else {
        serde_json::to_string_pretty(&parsed)
            .map(|text| text + "\n")
            .map_err(|e| schema_error(e.to_string()))
    }
}

#[async_trait]
impl Finalizer for ExternalServiceRegistrationFinalizer {
    fn name(&self) -> &'static str {
        "external-service-registration"
    }

    fn pending(&self) -> usize {
        self.state.len()
    }

    fn clear(&mut self) {
        self.reset();
    }

    async fn finalize(&self, _default_directory: Option<&Path>) -> ConvertResult<Vec<WriterFormat>> {
        let mut plan = Vec::with_capacity(self.state.len());
        for entry in self.state.values() {
            let infos = self.write_infos(entry)?;
            tracing::debug!(
                full_name = entry.component.full_name(),
                files = infos.len(),
                "writing external service registration"
            );
            plan.push(WriterFormat::new(entry.component.clone(), infos));
        }

        tracing::info!(registrations = plan.len(), "external service registrations finalized");
        Ok(plan)
    }
}

impl TransactionFinalizer for ExternalServiceRegistrationFinalizer {
    type State = ExternalServiceState;

    fn state(&self) -> &Self::State {
        &self.state
    }

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}
