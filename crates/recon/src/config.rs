use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ReconError;
use crate::pipeline::{Pipeline, Stage};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub name: String,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub analyses: Vec<AnalysisConfig>,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One input table. The engine only uses `name`; the rest tells the loader
/// how to cut the table out of its file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,
    /// Path relative to the config file.
    pub file: String,
    /// Worksheet for spreadsheet files; the first sheet when absent.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Data rows dropped after the header.
    #[serde(default)]
    pub skip_rows: usize,
    /// Positional column window `[column_start, column_end)`.
    #[serde(default)]
    pub column_start: Option<usize>,
    #[serde(default)]
    pub column_end: Option<usize>,
    /// Replacement column names, applied after the window.
    #[serde(default)]
    pub names: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Analyses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum AnalysisConfig {
    Describe {
        path: Vec<String>,
        table: String,
        columns: Vec<String>,
    },
    Correlation {
        path: Vec<String>,
        table: String,
        x: String,
        y: String,
        #[serde(default = "default_significance")]
        significance_level: f64,
    },
}

fn default_significance() -> f64 {
    terrastat_analysis::DEFAULT_SIGNIFICANCE
}

impl AnalysisConfig {
    pub fn path(&self) -> &[String] {
        match self {
            Self::Describe { path, .. } | Self::Correlation { path, .. } => path,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::Describe { table, .. } | Self::Correlation { table, .. } => table,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RunConfig = toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Build the validated stage list.
    pub fn pipeline(&self) -> Result<Pipeline, ReconError> {
        Pipeline::new(self.sources.iter().map(|s| s.name.clone()), self.stages.clone())
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation("at least one source is required".into()));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source for '{}' has an empty name",
                    source.file
                )));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            if let (Some(start), Some(end)) = (source.column_start, source.column_end) {
                if start > end {
                    return Err(ReconError::ConfigValidation(format!(
                        "source '{}': column_start {start} is after column_end {end}",
                        source.name
                    )));
                }
            }
        }

        let pipeline = self.pipeline()?;

        for (i, analysis) in self.analyses.iter().enumerate() {
            if analysis.path().is_empty() {
                return Err(ReconError::ConfigValidation(format!("analysis {i}: path is empty")));
            }
            if !pipeline.produces(analysis.table()) {
                return Err(ReconError::UnknownTable(format!(
                    "analysis {i} reads '{}', which no source or stage produces",
                    analysis.table()
                )));
            }
            if let AnalysisConfig::Correlation { significance_level, .. } = analysis {
                if !(*significance_level > 0.0 && *significance_level < 1.0) {
                    return Err(ReconError::ConfigValidation(format!(
                        "analysis {i}: significance_level must be in (0, 1), got {significance_level}"
                    )));
                }
            }
        }

        // A result cannot sit where another result needs a section.
        for (i, a) in self.analyses.iter().enumerate() {
            for b in &self.analyses[i + 1..] {
                let (short, long) = if a.path().len() <= b.path().len() {
                    (a.path(), b.path())
                } else {
                    (b.path(), a.path())
                };
                if long.starts_with(short) {
                    return Err(ReconError::ConfigValidation(format!(
                        "analysis path '{}' collides with '{}'",
                        short.join("/"),
                        long.join("/")
                    )));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
