use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for a diagnostic item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        };
        f.write_str(s)
    }
}

/// Category of a diagnostic item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    Mesh,
    Texture,
    Material,
    Match,
    Scene,
    Config,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticCategory::Mesh => "mesh",
            DiagnosticCategory::Texture => "texture",
            DiagnosticCategory::Material => "material",
            DiagnosticCategory::Match => "match",
            DiagnosticCategory::Scene => "scene",
            DiagnosticCategory::Config => "config",
        };
        f.write_str(s)
    }
}

/// A single finding collected during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Stable code for the kind of finding (e.g. "MATCH_UNMATCHED").
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Severity level.
    pub severity: DiagnosticSeverity,
    /// Category of the finding.
    pub category: DiagnosticCategory,
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity, self.code, self.category, self.message
        )
    }
}

/// End-of-run diagnostics for an import, match, reconcile or material pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// All findings, in the order they were raised.
    pub items: Vec<DiagnosticItem>,
    /// Count of errors.
    pub error_count: u32,
    /// Count of warnings.
    pub warning_count: u32,
    /// Count of info items.
    pub info_count: u32,
}

impl RunReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item and update counts.
    pub fn add(&mut self, item: DiagnosticItem) {
        match item.severity {
            DiagnosticSeverity::Error => self.error_count += 1,
            DiagnosticSeverity::Warning => self.warning_count += 1,
            DiagnosticSeverity::Info => self.info_count += 1,
        }
        self.items.push(item);
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: RunReport) {
        for item in other.items {
            self.add(item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items carrying the given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a DiagnosticItem> {
        self.items.iter().filter(move |item| item.code == code)
    }

    /// Render the report as the text shown to the operator at the end of a run.
    pub fn render(&self) -> String {
        let banner = "-".repeat(40);
        let mut out = String::new();
        out.push_str(&banner);
        out.push('\n');
        out.push_str(&format!(
            "Run report: {} error(s), {} warning(s), {} info\n",
            self.error_count, self.warning_count, self.info_count
        ));

        let sections = [
            ("Encrypted textures", "TEXTURE_PLACEHOLDER"),
            ("Unmatched meshes", "MATCH_UNMATCHED"),
            ("Duplicate relationship markers", "MARKER_DUPLICATE"),
        ];
        for (title, code) in sections {
            let lines: Vec<&str> = self.with_code(code).map(|i| i.message.as_str()).collect();
            if lines.is_empty() {
                continue;
            }
            out.push('\n');
            out.push_str(title);
            out.push_str(":\n");
            for line in lines {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }

        let other: Vec<&DiagnosticItem> = self
            .items
            .iter()
            .filter(|i| !sections.iter().any(|(_, code)| i.code == *code))
            .collect();
        if !other.is_empty() {
            out.push('\n');
            for item in other {
                out.push_str(&item.to_string());
                out.push('\n');
            }
        }

        out.push_str(&banner);
        out.push('\n');
        out
    }
}
