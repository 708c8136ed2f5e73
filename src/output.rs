use clap::ValueEnum;
use datum_core::{Body, DocOutput, Document, Payload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How much the CLI prints about each document operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Show {
    None,
    Minimal,
    #[default]
    Standard,
    Verbose,
}

impl fmt::Display for Show {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Show::None => write!(f, "none"),
            Show::Minimal => write!(f, "minimal"),
            Show::Standard => write!(f, "standard"),
            Show::Verbose => write!(f, "verbose"),
        }
    }
}

impl FromStr for Show {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Show::None),
            "minimal" => Ok(Show::Minimal),
            "standard" => Ok(Show::Standard),
            "verbose" => Ok(Show::Verbose),
            _ => Err(format!(
                "Invalid show level '{}'. Valid options: none, minimal, standard, verbose",
                s
            )),
        }
    }
}

/// Prints one line per document operation to stdout.
pub struct TerminalOutput {
    show: Show,
}

impl TerminalOutput {
    pub fn new(show: Show) -> Self {
        Self { show }
    }

    fn render(&self, action: &str, id: &str, doc: Option<&Value>) -> Option<String> {
        match self.show {
            Show::None => None,
            Show::Minimal => Some(format!("{} {}", action, id)),
            Show::Standard => Some(match doc.and_then(summary) {
                Some(summary) => format!("{} {} {}", action, id, summary),
                None => format!("{} {}", action, id),
            }),
            Show::Verbose => Some(match doc {
                Some(doc) => format!("{} {}\n{:#}", action, id, doc),
                None => format!("{} {}", action, id),
            }),
        }
    }

    fn print(&self, line: Option<String>) {
        if let Some(line) = line {
            println!("{}", line);
        }
    }
}

/// Human id and content of a document on one line.
fn summary(doc: &Value) -> Option<String> {
    let body = Body::from_fields(doc.as_object()?.clone()).ok()?;
    let content = match &body {
        Body::Datum { data, .. } => Value::Object(data.clone()).to_string(),
        Body::View { views, .. } => views.keys().cloned().collect::<Vec<_>>().join(","),
        Body::DataOnly(fields) => Value::Object(fields.clone()).to_string(),
    };
    Some(match body.human_id() {
        Some(human_id) => format!("({}) {}", human_id, content),
        None => content,
    })
}

impl DocOutput for TerminalOutput {
    fn show_exists(&self, doc: &Document) {
        self.print(self.render("EXISTS", &doc.id, Some(&doc.to_json())));
    }

    fn show_no_diff(&self, doc: &Document) {
        self.print(self.render("NODIFF", &doc.id, Some(&doc.to_json())));
    }

    fn show_create(&self, doc: &Document) {
        self.print(self.render("CREATE", &doc.id, Some(&doc.to_json())));
    }

    fn show_update(&self, _before: &Document, after: &Document) {
        self.print(self.render("UPDATE", &after.id, Some(&after.to_json())));
    }

    fn show_rename(&self, old_id: &str, new_id: &str) {
        self.print(self.render("RENAME", &format!("{} -> {}", old_id, new_id), None));
    }

    fn show_delete(&self, doc: &Document) {
        self.print(self.render("DELETE", &doc.id, Some(&doc.to_json())));
    }

    fn show_failed(&self, payload: &Payload) {
        let id = payload.id.as_deref().unwrap_or("<no id>");
        self.print(self.render("FAILED", id, Some(&payload.to_json())));
    }
}
