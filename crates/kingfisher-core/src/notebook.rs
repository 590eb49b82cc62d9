//! Statement tagging.
//!
//! Long-running statements show up in `pg_stat_activity` with their full
//! text. Prefixing each statement with a comment naming the notebook that
//! sent it lets a database administrator find whose query it is.

const NOTEBOOK_URL: &str = "https://colab.research.google.com/drive/";

/// Prefixes statements with the calling notebook's URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementTagger {
    notebook_id: Option<String>,
}

impl StatementTagger {
    pub fn new(notebook_id: Option<String>) -> Self {
        Self {
            notebook_id: notebook_id.filter(|id| !id.is_empty()),
        }
    }

    pub fn notebook_id(&self) -> Option<&str> {
        self.notebook_id.as_deref()
    }

    /// The comment that precedes every statement, if any.
    pub fn comment(&self) -> Option<String> {
        self.notebook_id
            .as_ref()
            .map(|id| format!("/* {}{} */", NOTEBOOK_URL, id.replace("*/", "")))
    }

    pub fn tag(&self, sql: &str) -> String {
        match self.comment() {
            Some(comment) => format!("{}{}", comment, sql),
            None => sql.to_string(),
        }
    }
}
