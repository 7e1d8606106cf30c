//! Parsing JS/TS sources into the literals that may hold image paths.

use oxc_allocator::Allocator;
use oxc_ast::ast::{StringLiteral, TemplateLiteral};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::{Parser, ParserReturn};
use oxc_span::{SourceType, Span};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{dynamic_references, static_references, Reference};
use crate::error::{Error, Result};

/// Byte range in the original source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl From<Span> for TextSpan {
    fn from(span: Span) -> Self {
        Self {
            start: span.start as usize,
            end: span.end as usize,
        }
    }
}

/// A literal node of interest, detached from the parser's arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLiteral {
    /// `'…'` or `"…"`, including JSX attribute strings and import sources
    Static {
        /// Span including the quotes
        span: TextSpan,
        value: String,
        /// Source text between the quotes is exactly `value` (no escapes)
        verbatim: bool,
    },
    /// `` `…` `` with its static chunks
    ///
    /// Never resolved or rewritten, even without interpolations.
    Template {
        /// Span including the backticks
        span: TextSpan,
        quasis: Vec<String>,
    },
}

impl SourceLiteral {
    /// Image references carried by this literal
    pub fn references(&self) -> Vec<Reference> {
        match self {
            SourceLiteral::Static { value, .. } => static_references(value),
            SourceLiteral::Template { quasis, .. } => dynamic_references(quasis),
        }
    }
}

/// Parse a source file and collect its string and template literals
///
/// Any parser diagnostic counts as a failure: a file that does not parse
/// cleanly cannot be analyzed or rewritten safely.
pub fn parse_literals(path: &Path, source: &str) -> Result<Vec<SourceLiteral>> {
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::tsx());
    let allocator = Allocator::default();

    let ParserReturn {
        program,
        errors,
        panicked,
        ..
    } = Parser::new(&allocator, source, source_type).parse();

    if panicked || !errors.is_empty() {
        let message = errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser aborted".to_string());
        return Err(Error::Parse {
            path: path.to_path_buf(),
            message,
        });
    }

    let mut collector = LiteralCollector {
        source,
        literals: Vec::new(),
    };
    collector.visit_program(&program);

    Ok(collector.literals)
}

/// AST visitor that records every string and template literal
struct LiteralCollector<'s> {
    source: &'s str,
    literals: Vec<SourceLiteral>,
}

impl LiteralCollector<'_> {
    fn interior_equals(&self, span: TextSpan, value: &str) -> bool {
        span.end >= span.start + 2
            && self.source.get(span.start + 1..span.end - 1) == Some(value)
    }
}

impl<'a> Visit<'a> for LiteralCollector<'_> {
    fn visit_string_literal(&mut self, it: &StringLiteral<'a>) {
        let span = TextSpan::from(it.span);
        let value = it.value.as_str();
        let verbatim = self.interior_equals(span, value);

        self.literals.push(SourceLiteral::Static {
            span,
            value: value.to_string(),
            verbatim,
        });
    }

    fn visit_template_literal(&mut self, it: &TemplateLiteral<'a>) {
        let quasis = it
            .quasis
            .iter()
            .map(|quasi| quasi.value.raw.as_str().to_string())
            .collect();

        self.literals.push(SourceLiteral::Template {
            span: TextSpan::from(it.span),
            quasis,
        });

        walk::walk_template_literal(self, it);
    }
}
