//! Load and save reconciliation between the text document and the mirror
//!
//! [`ConfigStore`] owns the live record and the snapshot taken when it was
//! loaded. Saves compare against that snapshot so an unchanged record never
//! touches storage, except right after the stores were created from
//! defaults, when each store is written once unconditionally.

use crate::codec::{self, Field, CONFIG_FILE_NAME, MAX_DOCUMENT_SIZE};
use crate::error::{Error, ParseError, Result};
use crate::firmware::BuildInfo;
use crate::mirror::{MirrorStatus, MirrorStore, NoUpgrade, UpgradeProcess};
use crate::record::ConfigRecord;
use bootcfg_platform::{FileStore, PlatformError, RegisterBus};
use serde::Serialize;

/// Where the store stands in the load/save lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationStatus {
    /// Nothing loaded yet
    DontConfigure,
    /// Loaded from storage
    Modify,
    /// Storage was unusable, the record holds defaults
    Create,
}

/// Which part of the record a save covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    /// Menu options, persisted in the text document
    MenuOptions,
    /// The `boot_config` byte, persisted in the mirror
    BootConfig,
}

/// What a save actually wrote
#[derive(Debug, Default)]
pub struct SaveReport {
    /// The text document was rewritten
    pub text_written: bool,
    /// The mirror block was rewritten
    pub mirror_written: bool,
    /// Mirror write failure; not fatal
    pub mirror_error: Option<PlatformError>,
}

impl SaveReport {
    /// Whether anything was written
    pub fn wrote_anything(&self) -> bool {
        self.text_written || self.mirror_written
    }
}

/// How the last load went
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// The record was reset to defaults
    pub used_defaults: bool,
    /// Why defaults were used
    pub reason: Option<String>,
    /// Outcome of the mirror read
    pub mirror: MirrorStatus,
}

/// Owner of the live configuration record and its two backing stores
pub struct ConfigStore<F: FileStore, B: RegisterBus> {
    files: F,
    mirror: MirrorStore<B>,
    build: BuildInfo,
    file_name: String,
    upgrade: Box<dyn UpgradeProcess>,
    record: ConfigRecord,
    snapshot: ConfigRecord,
    status: ConfigurationStatus,
    force_text: bool,
    force_mirror: bool,
    last_load: Option<LoadReport>,
}

impl<F: FileStore, B: RegisterBus> ConfigStore<F, B> {
    /// Create a store over a file store and a register bus.
    ///
    /// The record holds defaults until [`read_config`](Self::read_config) runs.
    pub fn new(files: F, bus: B, build: BuildInfo) -> Self {
        let record = ConfigRecord::defaults(&build);
        Self {
            files,
            mirror: MirrorStore::new(bus, build.version),
            file_name: CONFIG_FILE_NAME.to_string(),
            upgrade: Box::new(NoUpgrade),
            snapshot: record.clone(),
            record,
            build,
            status: ConfigurationStatus::DontConfigure,
            force_text: false,
            force_mirror: false,
            last_load: None,
        }
    }

    /// Use a different document name in the file store
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Use a migration hook other than [`NoUpgrade`]
    pub fn with_upgrade(mut self, upgrade: Box<dyn UpgradeProcess>) -> Self {
        self.upgrade = upgrade;
        self
    }

    /// Live record
    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    /// Live record, for editing
    pub fn record_mut(&mut self) -> &mut ConfigRecord {
        &mut self.record
    }

    /// Lifecycle status
    pub fn status(&self) -> ConfigurationStatus {
        self.status
    }

    /// Build the store was created for
    pub fn build(&self) -> &BuildInfo {
        &self.build
    }

    /// Report of the last [`read_config`](Self::read_config)
    pub fn last_load(&self) -> Option<&LoadReport> {
        self.last_load.as_ref()
    }

    /// Name of the document in the file store
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The file store
    pub fn files(&self) -> &F {
        &self.files
    }

    /// The mirror store
    pub fn mirror(&self) -> &MirrorStore<B> {
        &self.mirror
    }

    /// The mirror store, mutably
    pub fn mirror_mut(&mut self) -> &mut MirrorStore<B> {
        &mut self.mirror
    }

    fn load_text(&mut self) -> Result<ConfigRecord> {
        let bytes = match self.files.read(&self.file_name, MAX_DOCUMENT_SIZE - 1) {
            Ok(bytes) => bytes,
            Err(PlatformError::TooLarge { max, .. }) => {
                return Err(Error::DocumentTooLarge {
                    size: max + 1,
                    max,
                });
            }
            Err(e) => return Err(e.into()),
        };
        codec::parse_document_bytes(&bytes)
    }

    /// Load the record from both stores.
    ///
    /// Returns `false` when anything was unusable, in which case the record
    /// holds defaults and the next save of each kind is forced.
    pub fn read_config(&mut self) -> bool {
        let check = self.mirror.inspect();
        let text = self.load_text();

        let failure = match &text {
            Err(e) => Some(e.to_string()),
            Ok(_) if !check.is_usable() => Some("mirror block is unusable".to_string()),
            Ok(record) if !record.has_current_format() => Some(format!(
                "document format {}.{} is not {}.{}",
                record.format_version_major,
                record.format_version_minor,
                crate::firmware::CONFIG_VERSION_MAJOR,
                crate::firmware::CONFIG_VERSION_MINOR
            )),
            Ok(_) => None,
        };

        let mut record = match (text, &failure) {
            (Ok(record), None) => record,
            (_, reason) => {
                tracing::warn!(
                    "Using default configuration: {}",
                    reason.as_deref().unwrap_or("unknown")
                );
                ConfigRecord::defaults(&self.build)
            }
        };

        let mirror = self
            .mirror
            .reconcile(check, &mut record, self.upgrade.as_mut());
        tracing::debug!("Mirror status: {:?}", mirror);

        let ok = failure.is_none();
        self.snapshot = record.clone();
        self.record = record;
        self.status = if ok {
            ConfigurationStatus::Modify
        } else {
            ConfigurationStatus::Create
        };
        self.force_text = !ok;
        self.force_mirror = !ok;
        self.last_load = Some(LoadReport {
            used_defaults: !ok,
            reason: failure,
            mirror,
        });

        ok
    }

    /// Persist one kind of change if it differs from the loaded snapshot.
    ///
    /// A text write failure is an error. A mirror write failure is logged
    /// and returned in the report.
    pub fn write_config(&mut self, kind: SaveKind) -> Result<SaveReport> {
        let mut report = SaveReport::default();

        match kind {
            SaveKind::MenuOptions => {
                let changed = self.record.config != self.snapshot.config
                    || self.record.multi_config != self.snapshot.multi_config;
                if self.force_text || changed {
                    self.write_text()?;
                    report.text_written = true;
                }
                self.force_text = false;
            }
            SaveKind::BootConfig => {
                if self.force_mirror || self.record.boot_config != self.snapshot.boot_config {
                    match self.mirror.write(self.record.boot_config) {
                        Ok(_) => report.mirror_written = true,
                        Err(e) => {
                            tracing::warn!("Failed to write the mirror block: {}", e);
                            report.mirror_error = Some(e);
                        }
                    }
                }
                self.force_mirror = false;
            }
        }

        if self.status == ConfigurationStatus::Create && !self.force_text && !self.force_mirror {
            self.status = ConfigurationStatus::Modify;
        }

        tracing::debug!(
            "Save {:?}: text {}, mirror {}",
            kind,
            report.text_written,
            report.mirror_written
        );
        Ok(report)
    }

    /// Write both stores unconditionally
    pub fn write_all(&mut self) -> Result<SaveReport> {
        self.force_text = true;
        self.force_mirror = true;
        let mut report = self.write_config(SaveKind::BootConfig)?;
        report.text_written = self.write_config(SaveKind::MenuOptions)?.text_written;
        Ok(report)
    }

    fn write_text(&mut self) -> Result<()> {
        let text = codec::render_document(&self.record, &self.build)?;
        self.files
            .write(&self.file_name, text.as_bytes())
            .map_err(|source| Error::TextStoreWrite {
                name: self.file_name.clone(),
                source,
            })?;
        tracing::info!("Saved {} ({} bytes)", self.file_name, text.len());
        Ok(())
    }

    fn editable_field(section: &str, key: &str) -> Result<Field> {
        let field = codec::lookup(section, key).map_err(|kind| ParseError {
            line: 0,
            section: section.to_string(),
            key: key.to_string(),
            kind,
        })?;
        if matches!(field, Field::MetaMajor | Field::MetaMinor) {
            return Err(Error::InvalidOption {
                option: field.key(),
                message: "the format version is set by the firmware".to_string(),
            });
        }
        Ok(field)
    }

    /// Set one option of the live record from its text form
    pub fn apply_option(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        let field = Self::editable_field(section, key)?;
        field.apply(&mut self.record, value)?;
        tracing::debug!("Set [{}] {} = {}", section, key, value);
        Ok(())
    }

    /// Text form of one option of the live record
    pub fn option_value(&self, section: &str, key: &str) -> Result<String> {
        let field = codec::lookup(section, key).map_err(|kind| ParseError {
            line: 0,
            section: section.to_string(),
            key: key.to_string(),
            kind,
        })?;
        Ok(field.render(&self.record))
    }

    /// Consume the store, returning its collaborators
    pub fn into_parts(self) -> (F, B) {
        (self.files, self.mirror.into_inner())
    }
}
