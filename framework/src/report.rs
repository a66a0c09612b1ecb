//! Plain-text report of the errors found in one run.
//!
//! A [`Report`] is a list of [`Section`]s, one per source that returned rows.
//! Sources without rows contribute no section at all. Descriptions pass
//! through [`clean_error`] before rendering.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::OffsetDateTime;

use crate::clean::clean_error;
use crate::source::{CatalogError, Lookup, SourceError, StagingError, WarehouseError};

pub const CATALOG_HEADER: &str = "[ERROS CUBO]";
pub const WAREHOUSE_HEADER: &str = "[ERROS DW] (tabela etl_erros_dw)";
pub const STAGING_HEADER: &str = "[ERROS SA] (tabela etl_erros_staging)";
pub const NOTES_HEADER: &str = "[AVISO] Fontes indisponíveis";

/// How labels are laid out within a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `Label: value`
    Plain,
    /// Labels padded to a common width: `Label    : value`
    Aligned,
}

/// One record as labelled fields, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    fields: Vec<(&'static str, String)>,
}

impl Entry {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, label: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((label, value.to_string()));
        self
    }

    /// Adds the field only when a value is present.
    pub fn field_opt(self, label: &'static str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(value) => self.field(label, value),
            None => self,
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    title: String,
    layout: Layout,
    entries: Vec<Entry>,
}

impl Section {
    pub fn new(title: impl Into<String>, layout: Layout, entries: Vec<Entry>) -> Self {
        Self {
            title: title.into(),
            layout,
            entries,
        }
    }

    pub fn catalog(errors: &[CatalogError]) -> Self {
        let entries = errors
            .iter()
            .map(|e| {
                Entry::new()
                    .field("Execution ID", e.execution_id)
                    .field_opt("Data/Hora", e.message_time.map(format_timestamp))
                    .field("Projeto", &e.project_name)
                    .field("Pacote", &e.package_name)
                    .field("Mensagem Erro", clean_error(&e.message))
            })
            .collect();
        Self::new(CATALOG_HEADER, Layout::Aligned, entries)
    }

    pub fn warehouse(errors: &[WarehouseError]) -> Self {
        let entries = errors
            .iter()
            .map(|e| {
                Entry::new()
                    .field("JobID", e.job_id)
                    .field("Transformação", &e.transformation)
                    .field("Descrição", clean_error(&e.description))
            })
            .collect();
        Self::new(WAREHOUSE_HEADER, Layout::Plain, entries)
    }

    pub fn staging(errors: &[StagingError]) -> Self {
        let entries = errors
            .iter()
            .map(|e| {
                Entry::new()
                    .field("JobID", e.job_id)
                    .field("Transformação", &e.transformation)
                    .field("Campo", &e.field)
                    .field("Descrição", clean_error(&e.description))
            })
            .collect();
        Self::new(STAGING_HEADER, Layout::Plain, entries)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_lines(&self, lines: &mut Vec<String>) {
        let width = match self.layout {
            Layout::Plain => 0,
            Layout::Aligned => self
                .entries
                .iter()
                .flat_map(|e| e.fields.iter())
                .map(|(label, _)| label.chars().count())
                .max()
                .unwrap_or(0),
        };

        lines.push(self.title.clone());
        lines.push(String::new());
        for entry in &self.entries {
            for (label, value) in &entry.fields {
                lines.push(match self.layout {
                    Layout::Plain => format!("{label}: {value}"),
                    Layout::Aligned => format!("{label:<width$} : {value}"),
                });
            }
            lines.push(String::new());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    sections: Vec<Section>,
    notes: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section. Sections without entries are dropped.
    pub fn push(&mut self, section: Section) {
        if !section.is_empty() {
            self.sections.push(section);
        }
    }

    /// Record a source that could not be queried.
    pub fn unavailable(&mut self, lookup: Lookup, error: &SourceError) {
        self.notes
            .push(format!("Não foi possível consultar {lookup}: {error}"));
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// True when no source produced any row. Notes alone do not count.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for section in &self.sections {
            section.write_lines(&mut lines);
        }
        if !self.notes.is_empty() {
            lines.push(NOTES_HEADER.to_string());
            lines.push(String::new());
            lines.extend(self.notes.iter().cloned());
            lines.push(String::new());
        }
        lines.join("\n")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn format_timestamp(ts: OffsetDateTime) -> String {
    let format = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
    );
    ts.format(format).unwrap_or_else(|_| ts.to_string())
}

// -------------------------------------------------------------------------
// Transient report file
// -------------------------------------------------------------------------

/// On-disk copy of a rendered report, removed once the notification has been
/// attempted.
///
/// Call [`remove`](Self::remove) to observe the outcome. A file still present
/// when the guard is dropped is removed then, with failures only logged.
#[derive(Debug)]
pub struct ReportFile {
    path: PathBuf,
    removed: bool,
}

impl ReportFile {
    pub fn write(path: impl Into<PathBuf>, content: &str) -> io::Result<Self> {
        let path = path.into();
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "report file written");
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        std::fs::remove_file(&self.path)
    }
}

impl Drop for ReportFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "could not remove report file");
        }
    }
}
