use serde::Serialize;

/// How much attention a collected message needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Observability only (no-op branches, row counts).
    Info,
    /// Data looked suspicious but the rule still fired safely.
    Caution,
    /// A step was skipped or rejected; the operator should look.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Caution => write!(f, "caution"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub severity: Severity,
    /// Operation that produced the message, e.g. `strip_prefix`.
    pub context: String,
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

/// A stage result plus every soft failure it ran into.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self { value, warnings: Vec::new() }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome { value: f(self.value), warnings: self.warnings }
    }

    /// True if any entry is a `Severity::Warning`.
    pub fn has_warnings(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Warning)
    }

    /// Move the warnings into `sink` and return the value.
    pub fn drain_into(self, sink: &mut Warnings) -> T {
        sink.extend(self.warnings);
        self.value
    }
}

/// Warning collector. Every entry is also sent to the `log` facade when it is
/// recorded, so a run without a report still leaves a trail.
#[derive(Debug, Default, Clone)]
pub struct Warnings {
    entries: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, context: &str, message: impl Into<String>) {
        self.record(Severity::Info, context, message.into());
    }

    pub fn caution(&mut self, context: &str, message: impl Into<String>) {
        self.record(Severity::Caution, context, message.into());
    }

    pub fn warn(&mut self, context: &str, message: impl Into<String>) {
        self.record(Severity::Warning, context, message.into());
    }

    fn record(&mut self, severity: Severity, context: &str, message: String) {
        match severity {
            Severity::Info => log::info!("{context}: {message}"),
            Severity::Caution | Severity::Warning => log::warn!("{context}: {message}"),
        }
        self.entries.push(Warning { severity, context: context.to_string(), message });
    }

    /// Append already-logged entries.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = Warning>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[Warning] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish<T>(self, value: T) -> Outcome<T> {
        Outcome { value, warnings: self.entries }
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.entries
    }
}
