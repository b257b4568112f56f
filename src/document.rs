use std::{collections::HashSet, fs, path::Path, sync::Arc};

use serde::Deserialize;
use thiserror::Error;

use crate::chunk::{Chunk, terms};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("term id `{0}` is used more than once")]
    DuplicateId(String),
    #[error("term `{label}` has an empty id")]
    EmptyId { label: String },
}

/// A read-only chunk tree plus the title shown in the status bar.
#[derive(Clone, Debug)]
pub struct Document {
    pub title: String,
    pub root: Arc<[Chunk]>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Chunks(Vec<Chunk>),
    Titled {
        #[serde(default)]
        title: Option<String>,
        chunks: Vec<Chunk>,
    },
}

impl Document {
    /// Build a document, rejecting trees whose term ids are empty or not
    /// unique.
    pub fn new(title: impl Into<String>, root: Vec<Chunk>) -> Result<Self, DocumentError> {
        validate(&root)?;
        Ok(Self {
            title: title.into(),
            root: Arc::from(root),
        })
    }

    pub fn from_json(json: &str, fallback_title: &str) -> Result<Self, DocumentError> {
        let file: DocumentFile = serde_json::from_str(json)?;
        match file {
            DocumentFile::Chunks(chunks) => Self::new(fallback_title, chunks),
            DocumentFile::Titled { title, chunks } => {
                Self::new(title.unwrap_or_else(|| fallback_title.to_string()), chunks)
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let contents = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let fallback = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("document");
        let document = Self::from_json(&contents, fallback)?;
        log::info!(
            "loaded {} with {} terms",
            path.display(),
            crate::chunk::term_count(&document.root)
        );
        Ok(document)
    }

    /// The document shown when no file is given on the command line.
    pub fn sample() -> Self {
        Self {
            title: "NPN transistor".to_string(),
            root: Arc::from(sample_chunks()),
        }
    }
}

fn validate(chunks: &[Chunk]) -> Result<(), DocumentError> {
    fn walk<'a>(chunks: &'a [Chunk], seen: &mut HashSet<&'a str>) -> Result<(), DocumentError> {
        for term in terms(chunks) {
            if term.id.is_empty() {
                return Err(DocumentError::EmptyId {
                    label: term.label.clone(),
                });
            }
            if !seen.insert(term.id.as_str()) {
                return Err(DocumentError::DuplicateId(term.id.clone()));
            }
            walk(&term.expansion, seen)?;
        }
        Ok(())
    }

    walk(chunks, &mut HashSet::new())
}

fn sample_chunks() -> Vec<Chunk> {
    vec![
        Chunk::text("An "),
        Chunk::term(
            "npn",
            "NPN transistor",
            vec![
                Chunk::text("A three-layer "),
                Chunk::term(
                    "semi",
                    "semiconductor",
                    vec![
                        Chunk::text("A material with electrical "),
                        Chunk::leaf("conductivity", "conductivity"),
                        Chunk::text(" between a conductor and insulator. "),
                        Chunk::leaf("silicon", "Silicon"),
                        Chunk::text(" is the most common example."),
                    ],
                ),
                Chunk::text(" sandwich: n-type, p-type, n-type. The middle p-layer is the "),
                Chunk::term(
                    "base",
                    "base",
                    vec![
                        Chunk::text("The thin middle layer. When "),
                        Chunk::leaf("fwd-bias", "forward-biased"),
                        Chunk::text(", it allows electrons to flow through the transistor."),
                    ],
                ),
                Chunk::text("."),
            ],
        ),
        Chunk::text(" is a "),
        Chunk::term(
            "ccs",
            "current-controlled switch",
            vec![
                Chunk::text("A small "),
                Chunk::term(
                    "current",
                    "current",
                    vec![
                        Chunk::text("The flow of "),
                        Chunk::leaf("charge", "electric charge"),
                        Chunk::text(", measured in "),
                        Chunk::leaf("amps", "amperes"),
                        Chunk::text("."),
                    ],
                ),
                Chunk::text(" into the base controls a larger current from "),
                Chunk::term(
                    "collector",
                    "collector",
                    vec![Chunk::text(
                        "The n-type layer that receives electrons from the base. \
                         Connected to the positive side of the power supply.",
                    )],
                ),
                Chunk::text(" to "),
                Chunk::term(
                    "emitter",
                    "emitter",
                    vec![Chunk::text(
                        "The n-type layer that supplies electrons. \
                         Connected to ground or negative side.",
                    )],
                ),
                Chunk::text("."),
            ],
        ),
        Chunk::text(
            ": a small current into the base allows a larger current to flow from collector to emitter.",
        ),
    ]
}
