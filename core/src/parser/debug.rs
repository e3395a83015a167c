/// A running trail of which decision rule fired during parsing, surfaced to
/// operators trying to understand why a field came out a given way. Mirrors
/// the `notes: Vec<String>` pattern used for Ricoh counter-strategy inference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseDebug {
    pub notes: Vec<String>,
}

impl ParseDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    pub fn rejected(&mut self, field: &str, value: &str, reason: &str) {
        self.note(format!("rejected {field} candidate {value:?}: {reason}"));
    }

    pub fn chosen(&mut self, field: &str, value: &str, source: &str) {
        self.note(format!("{field} = {value:?} (from {source})"));
    }
}
