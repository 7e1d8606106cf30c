//! Image references found in source code.
//!
//! A source file is parsed once into a flat list of [`SourceLiteral`]s (see
//! [`parser`]); each literal then yields zero or more [`Reference`]s. A single
//! literal can yield several references when it holds a source-set style
//! value such as `"/img/a.jpg 1x, /img/b.jpg 2x"`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod parser;

pub use parser::{parse_literals, SourceLiteral, TextSpan};

static IMAGE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpe?g)$").expect("image extension pattern is valid"));

// Trailing width/density descriptor of a single source-set entry, e.g. `2x` or `640w`
static DESCRIPTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?[wx]$").expect("descriptor pattern is valid"));

/// How a reference was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// Plain string; can be resolved to a concrete file
    Static,
    /// Static chunk of a template with interpolations; only ever warned about
    Dynamic,
}

/// One image path extracted from a literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Candidate as written, including any query suffix
    pub raw_text: String,

    /// Candidate with query suffix and descriptor stripped
    pub clean_path: String,

    /// Verbatim suffix starting at the first `?`, empty if none
    pub query: String,

    /// Byte offset of `clean_path` inside the literal's value
    pub offset: usize,

    pub kind: ReferenceKind,
}

impl Reference {
    pub fn is_static(&self) -> bool {
        self.kind == ReferenceKind::Static
    }

    /// Whether the path is root-absolute (`/images/a.png`)
    pub fn is_root_absolute(&self) -> bool {
        self.clean_path.starts_with('/')
    }

    /// Byte range of the image extension (including the dot) inside the literal's value
    pub fn extension_range(&self) -> Option<std::ops::Range<usize>> {
        let m = IMAGE_EXTENSION.find(&self.clean_path)?;
        Some(self.offset + m.start()..self.offset + m.end())
    }
}

/// Whether a path ends in `.png`, `.jpg` or `.jpeg` (any case)
pub fn has_image_extension(path: &str) -> bool {
    IMAGE_EXTENSION.is_match(path)
}

/// External or inline URLs never resolve to a local file
pub fn is_external(path: &str) -> bool {
    path.starts_with("http") || path.starts_with("data:")
}

/// Extract every static image reference from a literal value
pub fn static_references(value: &str) -> Vec<Reference> {
    // Commas inside a data URI are payload, not source-set separators
    if value.trim_start().starts_with("data:") {
        return Vec::new();
    }

    candidate_tokens(value)
        .into_iter()
        .filter_map(|(token, offset)| {
            let (clean_path, query) = match token.find('?') {
                Some(idx) => (&token[..idx], &token[idx..]),
                None => (token, ""),
            };

            if !has_image_extension(clean_path) || is_external(clean_path) {
                return None;
            }

            Some(Reference {
                raw_text: token.to_string(),
                clean_path: clean_path.to_string(),
                query: query.to_string(),
                offset,
                kind: ReferenceKind::Static,
            })
        })
        .collect()
}

/// Static chunks of a template literal that look like image paths
pub fn dynamic_references(quasis: &[String]) -> Vec<Reference> {
    quasis
        .iter()
        .filter(|quasi| has_image_extension(quasi))
        .map(|quasi| Reference {
            raw_text: quasi.clone(),
            clean_path: quasi.clone(),
            query: String::new(),
            offset: 0,
            kind: ReferenceKind::Dynamic,
        })
        .collect()
}

/// Split a literal into candidate tokens with their byte offsets
fn candidate_tokens(value: &str) -> Vec<(&str, usize)> {
    if value.contains(',') {
        let mut tokens = Vec::new();
        let mut segment_start = 0;
        for segment in value.split(',') {
            if let Some(token) = first_token(segment, segment_start) {
                tokens.push(token);
            }
            segment_start += segment.len() + 1;
        }
        return tokens;
    }

    let leading = value.len() - value.trim_start().len();
    let trimmed = value.trim();
    let mut parts = trimmed.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(token), Some(descriptor), None) if DESCRIPTOR.is_match(descriptor) => {
            vec![(token, leading)]
        }
        (Some(_), _, _) => vec![(trimmed, leading)],
        (None, _, _) => Vec::new(),
    }
}

fn first_token(segment: &str, segment_start: usize) -> Option<(&str, usize)> {
    let leading = segment.len() - segment.trim_start().len();
    let token = segment.trim_start().split_whitespace().next()?;
    Some((token, segment_start + leading))
}
