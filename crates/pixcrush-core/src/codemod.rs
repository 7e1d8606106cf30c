//! Rewriting image references after conversion.
//!
//! Source files are never re-printed from a syntax tree. Each file is parsed,
//! every string literal that resolves to a converted image yields an [`Edit`],
//! and the edits are applied to the original text. Everything outside the
//! edited bytes is preserved exactly.

use indexmap::IndexMap;
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::logging::{log_file_error, log_fs_change, log_parse_failure, FileOp, Phase};
use crate::references::{parse_literals, static_references, Reference, SourceLiteral};
use crate::resolver::{self, PathStyle, ResolveContext};
use crate::tracker::relative_to;
use crate::types::{ConversionOutcome, RewriteResult};

/// Replacement of a byte range in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

/// Rewrites planned for one source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePlan {
    pub edits: Vec<Edit>,

    /// References to converted images that could not be rewritten
    pub unedited_references: usize,
}

/// Normalized original path -> normalized converted path
pub type ConversionLookup = IndexMap<PathBuf, PathBuf>;

/// Build the lookup from successful conversions only
pub fn conversion_lookup(conversions: &[ConversionOutcome]) -> ConversionLookup {
    conversions
        .iter()
        .filter(|c| !c.skipped && !c.new_path.as_os_str().is_empty())
        .map(|c| {
            (
                resolver::normalize(&c.original_path),
                resolver::normalize(&c.new_path),
            )
        })
        .collect()
}

/// Rewrite references to converted images across all source files
pub fn update_code_references(
    code_files: &[PathBuf],
    conversions: &[ConversionOutcome],
    target_dir: &Path,
    dry_run: bool,
) -> RewriteResult {
    let mut result = RewriteResult::default();

    let lookup = conversion_lookup(conversions);
    if lookup.is_empty() {
        return result;
    }

    for file in code_files {
        let source = match std::fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                log_file_error(file, FileOp::Read, &e);
                result.parse_failure_files.push(relative_to(file, target_dir));
                continue;
            }
        };

        let plan = match plan_edits(file, &source, target_dir, &lookup) {
            Ok(plan) => plan,
            Err(e) => {
                log_parse_failure(file, Phase::Codemod, &e.to_string());
                result.parse_failure_files.push(relative_to(file, target_dir));
                continue;
            }
        };

        if plan.unedited_references > 0 {
            warn!(
                "{} reference(s) to converted images in {} could not be rewritten",
                plan.unedited_references,
                file.display()
            );
            result.unedited_files.push(relative_to(file, target_dir));
        }

        if plan.edits.is_empty() {
            continue;
        }

        if !dry_run {
            let updated = apply_edits(&source, &plan.edits);
            if let Err(e) = std::fs::write(file, updated) {
                log_file_error(file, FileOp::Write, &e);
                result.write_failure_files.push(relative_to(file, target_dir));
                continue;
            }
            log_fs_change(
                FileOp::Rewrite,
                file,
                Some(&format!("{} reference(s) updated", plan.edits.len())),
            );
        }

        result.updated_files_count += 1;
    }

    result
}

/// Compute the edits for one source file
///
/// Escape-free literals get their extension bytes swapped in place. A literal
/// with backslash escapes is re-emitted whole from its rewritten value. Any
/// other literal whose text differs from its value is left alone and counted
/// as unedited.
pub fn plan_edits(
    file: &Path,
    source: &str,
    target_dir: &Path,
    lookup: &ConversionLookup,
) -> crate::Result<FilePlan> {
    let literals = parse_literals(file, source)?;
    let ctx = ResolveContext {
        target_dir,
        source_file: file,
    };

    let mut plan = FilePlan::default();
    for literal in &literals {
        let SourceLiteral::Static {
            span,
            value,
            verbatim,
        } = literal
        else {
            continue;
        };

        let swaps = value_edits(value, &ctx, lookup);
        if swaps.is_empty() {
            continue;
        }

        let interior = source.get(span.start + 1..span.end - 1).unwrap_or_default();
        if *verbatim {
            let value_start = span.start + 1;
            plan.edits.extend(swaps.into_iter().map(|edit| Edit {
                start: value_start + edit.start,
                end: value_start + edit.end,
                replacement: edit.replacement,
            }));
        } else if interior.contains('\\') {
            let quote = match source.as_bytes().get(span.start) {
                Some(b'\'') => '\'',
                _ => '"',
            };
            debug!(
                "Re-emitting escaped literal {:?} in {}",
                value,
                file.display()
            );
            plan.edits.push(Edit {
                start: span.start,
                end: span.end,
                replacement: quote_literal(&apply_edits(value, &swaps), quote),
            });
        } else {
            plan.unedited_references += swaps.len();
        }
    }

    Ok(plan)
}

/// Extension swaps for every converted reference, relative to the literal's value
fn value_edits(value: &str, ctx: &ResolveContext, lookup: &ConversionLookup) -> Vec<Edit> {
    static_references(value)
        .iter()
        .filter_map(|reference| {
            let new_path = match_conversion(reference, ctx, lookup)?;
            let range = reference.extension_range()?;
            let extension = new_path.extension()?;
            Some(Edit {
                start: range.start,
                end: range.end,
                replacement: format!(".{}", extension.to_string_lossy()),
            })
        })
        .collect()
}

/// Quote a value as a JS string literal
fn quote_literal(value: &str, quote: char) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(quote);
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\u{2028}' => quoted.push_str("\\u2028"),
            '\u{2029}' => quoted.push_str("\\u2029"),
            c if c == quote => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push(quote);
    quoted
}

/// Find the converted image a reference points at, if any
///
/// Exact candidate matches win. Otherwise the first converted image whose path
/// ends with the reference's suffix is taken, compared by whole path
/// components so `a.png` never matches `banana.png`.
pub fn match_conversion<'m>(
    reference: &Reference,
    ctx: &ResolveContext,
    lookup: &'m ConversionLookup,
) -> Option<&'m PathBuf> {
    if let Some(new_path) = resolver::candidates(reference, ctx)
        .iter()
        .find_map(|candidate| lookup.get(candidate))
    {
        return Some(new_path);
    }

    let suffixes: Vec<PathBuf> = match PathStyle::of(reference) {
        PathStyle::RootAbsolute => {
            let suffix = resolver::public_suffix(reference);
            vec![Path::new("public").join(suffix), PathBuf::from(suffix)]
        }
        PathStyle::Relative => vec![PathBuf::from(resolver::alias_suffix(reference))],
    };

    suffixes
        .iter()
        .filter(|suffix| !suffix.as_os_str().is_empty())
        .find_map(|suffix| {
            lookup
                .iter()
                .find(|(original, _)| original.ends_with(suffix))
                .map(|(_, new_path)| new_path)
        })
}

/// Apply non-overlapping edits to the source text
pub fn apply_edits(source: &str, edits: &[Edit]) -> String {
    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by_key(|edit| std::cmp::Reverse(edit.start));

    let mut output = source.to_string();
    let mut limit = output.len();
    for edit in sorted {
        if edit.end > limit || edit.start > edit.end {
            debug!("Dropping overlapping edit at {}..{}", edit.start, edit.end);
            continue;
        }
        output.replace_range(edit.start..edit.end, &edit.replacement);
        limit = edit.start;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) -> PathBuf {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        path.to_path_buf()
    }

    fn converted(original: &Path) -> ConversionOutcome {
        ConversionOutcome {
            original_path: original.to_path_buf(),
            new_path: original.with_extension("webp"),
            original_size: 1000,
            new_size: 100,
            skipped: false,
            error: None,
        }
    }

    #[test]
    fn test_apply_edits_back_to_front() {
        let source = "a.png b.jpg";
        let edits = vec![
            Edit {
                start: 1,
                end: 5,
                replacement: ".webp".to_string(),
            },
            Edit {
                start: 7,
                end: 11,
                replacement: ".webp".to_string(),
            },
        ];
        assert_eq!(apply_edits(source, &edits), "a.webp b.webp");
    }

    #[test]
    fn test_query_suffix_is_preserved() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let page = write(
            &root.join("app/page.tsx"),
            "export default () => <img src=\"/images/a.png?v=2\" />;\n",
        );
        let image = root.join("public/images/a.png");

        let result = update_code_references(&[page.clone()], &[converted(&image)], root, false);

        assert_eq!(result.updated_files_count, 1);
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "export default () => <img src=\"/images/a.webp?v=2\" />;\n"
        );
    }

    #[test]
    fn test_unmatched_reference_is_left_alone() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let source = "import a from './a.png';\nimport b from './b.png';\n";
        let page = write(&root.join("src/index.ts"), source);

        let result = update_code_references(
            &[page.clone()],
            &[converted(&root.join("src/a.png"))],
            root,
            false,
        );

        assert_eq!(result.updated_files_count, 1);
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "import a from './a.webp';\nimport b from './b.png';\n"
        );
    }

    #[test]
    fn test_suffix_fallback_respects_component_boundaries() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let source = "const a = 'a.png';\n";
        let page = write(&root.join("src/lib/util.ts"), source);

        let result = update_code_references(
            &[page.clone()],
            &[converted(&root.join("public/banana.png"))],
            root,
            false,
        );

        assert_eq!(result.updated_files_count, 0);
        assert_eq!(fs::read_to_string(&page).unwrap(), source);
    }

    #[test]
    fn test_monorepo_public_suffix_fallback() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let page = write(
            &root.join("apps/web/app/page.tsx"),
            "const logo = '/images/logo.png';\n",
        );

        let result = update_code_references(
            &[page.clone()],
            &[converted(&root.join("apps/web/public/images/logo.png"))],
            root,
            false,
        );

        assert_eq!(result.updated_files_count, 1);
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "const logo = '/images/logo.webp';\n"
        );
    }

    #[test]
    fn test_source_set_segments_are_rewritten_independently() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let page = write(
            &root.join("app/page.tsx"),
            "const s = \"/img/a.jpg 1x, /img/b.jpg 2x\";\n",
        );

        update_code_references(
            &[page.clone()],
            &[converted(&root.join("public/img/b.jpg"))],
            root,
            false,
        );

        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "const s = \"/img/a.jpg 1x, /img/b.webp 2x\";\n"
        );
    }

    #[test]
    fn test_escaped_literal_is_re_emitted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let page = write(
            &root.join("app/page.ts"),
            "const a = \"\\/images\\/a.png?v=1\";\nconst b = '\\u002Fimg\\u002Fb.jpg';\n",
        );

        let result = update_code_references(
            &[page.clone()],
            &[
                converted(&root.join("public/images/a.png")),
                converted(&root.join("public/img/b.jpg")),
            ],
            root,
            false,
        );

        assert_eq!(result.updated_files_count, 1);
        assert!(result.unedited_files.is_empty());
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "const a = \"/images/a.webp?v=1\";\nconst b = '/img/b.webp';\n"
        );
    }

    #[test]
    fn test_quote_literal_escapes_what_it_must() {
        assert_eq!(quote_literal("/a.webp", '"'), "\"/a.webp\"");
        assert_eq!(quote_literal("it's\\a.webp", '\''), "'it\\'s\\\\a.webp'");
        assert_eq!(quote_literal("say \"hi\"\n", '"'), "\"say \\\"hi\\\"\\n\"");
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let page = write(&root.join("src/App.tsx"), "import hero from './hero.png';\n");
        let conversions = [converted(&root.join("src/hero.png"))];

        let first = update_code_references(&[page.clone()], &conversions, root, false);
        let after_first = fs::read_to_string(&page).unwrap();
        let second = update_code_references(&[page.clone()], &conversions, root, false);

        assert_eq!(first.updated_files_count, 1);
        assert_eq!(second.updated_files_count, 0);
        assert_eq!(fs::read_to_string(&page).unwrap(), after_first);
        assert_eq!(after_first, "import hero from './hero.webp';\n");
    }

    #[test]
    fn test_dry_run_counts_but_does_not_write() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let source = "import hero from './hero.png';\n";
        let page = write(&root.join("src/App.tsx"), source);

        let result = update_code_references(
            &[page.clone()],
            &[converted(&root.join("src/hero.png"))],
            root,
            true,
        );

        assert_eq!(result.updated_files_count, 1);
        assert_eq!(fs::read_to_string(&page).unwrap(), source);
    }

    #[test]
    fn test_parse_failures_are_collected() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let broken = write(&root.join("src/broken.jsx"), "const = <div");

        let result = update_code_references(
            &[broken],
            &[converted(&root.join("src/hero.png"))],
            root,
            false,
        );

        assert_eq!(result.parse_failure_files, vec![PathBuf::from("src/broken.jsx")]);
        assert_eq!(result.updated_files_count, 0);
    }

    #[test]
    fn test_no_successful_conversions_is_a_no_op() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let broken = write(&root.join("src/broken.jsx"), "const = <div");
        let mut skipped = converted(&root.join("src/hero.png"));
        skipped.skipped = true;

        let result = update_code_references(&[broken], &[skipped], root, false);

        assert_eq!(result.updated_files_count, 0);
        assert!(result.parse_failure_files.is_empty());
    }
}
