//! Store traits and the JSON-file-backed implementation.
//!
//! The core consumes three narrow store interfaces; the bundled
//! implementation keeps every entity as pretty-printed JSON under a data
//! directory:
//!
//! ```text
//! <root>/templates/<template_id>.json
//! <root>/toolkits/<toolkit_id>.json
//! <root>/checkins/ci_<toolkit_id>_<stamp>.json
//! ```
//!
//! Writes go through a temp-file rename so a crashed process never leaves
//! a half-written entity behind. Serializing concurrent writers per
//! toolkit id remains the deployment's responsibility.

use crate::model::{CheckInRecord, Toolkit};
use kitcheck_analyze::Template;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Read access to templates and their reference images.
pub trait TemplateStore {
    fn get_template(&self, template_id: &str) -> Result<Template, StoreError>;
    fn put_template(&self, template: &Template) -> Result<(), StoreError>;
    fn list_templates(&self) -> Result<Vec<Template>, StoreError>;
    /// Encoded reference image the template's regions were drawn on.
    fn reference_image(&self, template_id: &str) -> Result<Vec<u8>, StoreError>;
    fn put_reference_image(&self, template_id: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Read/overwrite access to toolkit instances.
pub trait ToolkitStore {
    fn get_toolkit(&self, toolkit_id: &str) -> Result<Toolkit, StoreError>;
    /// Full-state overwrite; the caller guarantees read-modify-write
    /// atomicity per toolkit id.
    fn put_toolkit(&self, toolkit: &Toolkit) -> Result<(), StoreError>;
    fn list_toolkits(&self) -> Result<Vec<Toolkit>, StoreError>;
}

/// Append-only check-in history.
pub trait HistoryStore {
    fn append_record(&self, record: &CheckInRecord) -> Result<(), StoreError>;
    /// Records for one toolkit, most recent first, at most `limit`.
    fn history(&self, toolkit_id: &str, limit: usize) -> Result<Vec<CheckInRecord>, StoreError>;
}

/// JSON files under a data directory.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (creating directories as needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for sub in ["templates", "toolkits", "checkins"] {
            fs::create_dir_all(root.join(sub))?;
        }
        Ok(Self { root })
    }

    fn template_path(&self, id: &str) -> PathBuf {
        self.root.join("templates").join(format!("{id}.json"))
    }

    fn reference_image_path(&self, id: &str) -> PathBuf {
        self.root.join("templates/images").join(format!("{id}.png"))
    }

    fn toolkit_path(&self, id: &str) -> PathBuf {
        self.root.join("toolkits").join(format!("{id}.json"))
    }

    fn checkin_path(&self, checkin_id: &str) -> PathBuf {
        self.root.join("checkins").join(format!("{checkin_id}.json"))
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
        kind: &'static str,
        id: &str,
    ) -> Result<T, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn read_dir_json<T: serde::de::DeserializeOwned>(
        &self,
        dir: &Path,
    ) -> Result<Vec<T>, StoreError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(v) => out.push(v),
                Err(err) => log::warn!("skipping unreadable entity {}: {err}", path.display()),
            }
        }
        Ok(out)
    }
}

impl TemplateStore for JsonFileStore {
    fn get_template(&self, template_id: &str) -> Result<Template, StoreError> {
        self.read_json(&self.template_path(template_id), "template", template_id)
    }

    fn put_template(&self, template: &Template) -> Result<(), StoreError> {
        self.write_json(&self.template_path(&template.template_id), template)
    }

    fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        let mut templates: Vec<Template> = self.read_dir_json(&self.root.join("templates"))?;
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    fn reference_image(&self, template_id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.reference_image_path(template_id);
        if !path.exists() {
            return Err(StoreError::NotFound {
                kind: "reference image",
                id: template_id.to_string(),
            });
        }
        Ok(fs::read(path)?)
    }

    fn put_reference_image(&self, template_id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.reference_image_path(template_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("png.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl ToolkitStore for JsonFileStore {
    fn get_toolkit(&self, toolkit_id: &str) -> Result<Toolkit, StoreError> {
        self.read_json(&self.toolkit_path(toolkit_id), "toolkit", toolkit_id)
    }

    fn put_toolkit(&self, toolkit: &Toolkit) -> Result<(), StoreError> {
        self.write_json(&self.toolkit_path(&toolkit.toolkit_id), toolkit)
    }

    fn list_toolkits(&self) -> Result<Vec<Toolkit>, StoreError> {
        let mut toolkits: Vec<Toolkit> = self.read_dir_json(&self.root.join("toolkits"))?;
        toolkits.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(toolkits)
    }
}

impl HistoryStore for JsonFileStore {
    fn append_record(&self, record: &CheckInRecord) -> Result<(), StoreError> {
        self.write_json(&self.checkin_path(&record.checkin_id), record)
    }

    fn history(&self, toolkit_id: &str, limit: usize) -> Result<Vec<CheckInRecord>, StoreError> {
        let all: Vec<CheckInRecord> = self.read_dir_json(&self.root.join("checkins"))?;
        let mut records: Vec<CheckInRecord> = all
            .into_iter()
            .filter(|r| r.toolkit_id == toolkit_id)
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}
