//! Candidate paths for image references.
//!
//! Each framework convention is one [`ResolutionRule`] in [`RULES`]. Rules are
//! pure: given a reference and the file it was found in, they name one
//! absolute path the reference might denote. Callers union the results.

use path_clean::PathClean;
use std::path::{Path, PathBuf};

use crate::references::Reference;

/// Where a reference and its source file live
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub target_dir: &'a Path,
    pub source_file: &'a Path,
}

/// Shape of a reference a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// `/images/a.png`
    RootAbsolute,
    /// `./a.png`, `../a.png`, `assets/a.png`, `@/assets/a.png`, `~/a.png`
    Relative,
}

impl PathStyle {
    pub fn of(reference: &Reference) -> Self {
        if reference.is_root_absolute() {
            PathStyle::RootAbsolute
        } else {
            PathStyle::Relative
        }
    }
}

/// One framework path convention
pub struct ResolutionRule {
    pub name: &'static str,
    pub style: PathStyle,
    pub resolve: fn(&Reference, &ResolveContext) -> PathBuf,
}

/// All known conventions, in the order they are tried
pub const RULES: &[ResolutionRule] = &[
    ResolutionRule {
        name: "public-dir",
        style: PathStyle::RootAbsolute,
        resolve: public_dir,
    },
    ResolutionRule {
        name: "project-root",
        style: PathStyle::RootAbsolute,
        resolve: project_root,
    },
    ResolutionRule {
        name: "src-public-dir",
        style: PathStyle::RootAbsolute,
        resolve: src_public_dir,
    },
    ResolutionRule {
        name: "relative-to-file",
        style: PathStyle::Relative,
        resolve: relative_to_file,
    },
    ResolutionRule {
        name: "alias-root",
        style: PathStyle::Relative,
        resolve: alias_root,
    },
    ResolutionRule {
        name: "alias-src",
        style: PathStyle::Relative,
        resolve: alias_src,
    },
];

fn public_dir(r: &Reference, ctx: &ResolveContext) -> PathBuf {
    ctx.target_dir.join("public").join(public_suffix(r))
}

fn project_root(r: &Reference, ctx: &ResolveContext) -> PathBuf {
    ctx.target_dir.join(public_suffix(r))
}

fn src_public_dir(r: &Reference, ctx: &ResolveContext) -> PathBuf {
    ctx.target_dir.join("src").join("public").join(public_suffix(r))
}

// Uses the reference exactly as written, alias markers included
fn relative_to_file(r: &Reference, ctx: &ResolveContext) -> PathBuf {
    let dir = ctx.source_file.parent().unwrap_or(ctx.target_dir);
    dir.join(&r.clean_path)
}

fn alias_root(r: &Reference, ctx: &ResolveContext) -> PathBuf {
    ctx.target_dir.join(alias_suffix(r))
}

fn alias_src(r: &Reference, ctx: &ResolveContext) -> PathBuf {
    ctx.target_dir.join("src").join(alias_suffix(r))
}

/// Every normalized path the reference could denote
pub fn candidates(reference: &Reference, ctx: &ResolveContext) -> Vec<PathBuf> {
    let style = PathStyle::of(reference);
    RULES
        .iter()
        .filter(|rule| rule.style == style)
        .map(|rule| {
            let path = normalize(&(rule.resolve)(reference, ctx));
            log::trace!("{} [{}] -> {}", reference.clean_path, rule.name, path.display());
            path
        })
        .collect()
}

/// Root-absolute reference with the leading slash removed
pub fn public_suffix(reference: &Reference) -> &str {
    reference
        .clean_path
        .strip_prefix('/')
        .unwrap_or(&reference.clean_path)
}

/// Relative reference with any `@/`, `@`, `~/` or `~` alias marker removed
pub fn alias_suffix(reference: &Reference) -> &str {
    let path = reference.clean_path.as_str();
    let stripped = ["@/", "@", "~/", "~"]
        .iter()
        .find_map(|marker| path.strip_prefix(marker))
        .unwrap_or(path);
    stripped.trim_start_matches('/')
}

/// Lexically normalized form used for all path comparisons
pub fn normalize(path: &Path) -> PathBuf {
    path.clean()
}

/// Plain string suffix test used by classification
///
/// Accepts `.../public/{suffix}` and `...{suffix}`; matching is deliberately
/// loose so an image that might be referenced is never reported as unused.
pub fn ends_with_public_usage(image: &Path, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    let image = image.to_string_lossy();
    let public = Path::new("public").join(suffix);
    image.ends_with(public.to_string_lossy().as_ref()) || image.ends_with(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::static_references;

    fn reference(value: &str) -> Reference {
        static_references(value).remove(0)
    }

    fn ctx<'a>(target: &'a Path, file: &'a Path) -> ResolveContext<'a> {
        ResolveContext {
            target_dir: target,
            source_file: file,
        }
    }

    #[test]
    fn test_root_absolute_candidates() {
        let target = Path::new("/repo");
        let file = Path::new("/repo/app/page.tsx");
        let paths = candidates(&reference("/images/a.png"), &ctx(target, file));

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/repo/public/images/a.png"),
                PathBuf::from("/repo/images/a.png"),
                PathBuf::from("/repo/src/public/images/a.png"),
            ]
        );
    }

    #[test]
    fn test_relative_candidates() {
        let target = Path::new("/repo");
        let file = Path::new("/repo/components/Hero.tsx");
        let paths = candidates(&reference("./a.jpg"), &ctx(target, file));

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/repo/components/a.jpg"),
                PathBuf::from("/repo/a.jpg"),
                PathBuf::from("/repo/src/a.jpg"),
            ]
        );
    }

    #[test]
    fn test_parent_relative_is_normalized() {
        let target = Path::new("/repo");
        let file = Path::new("/repo/src/components/Hero.tsx");
        let paths = candidates(&reference("../assets/hero.png"), &ctx(target, file));

        assert_eq!(paths[0], PathBuf::from("/repo/src/assets/hero.png"));
    }

    #[test]
    fn test_alias_markers_are_stripped() {
        assert_eq!(alias_suffix(&reference("@/assets/a.png")), "assets/a.png");
        assert_eq!(alias_suffix(&reference("@assets/a.png")), "assets/a.png");
        assert_eq!(alias_suffix(&reference("~/assets/a.png")), "assets/a.png");
        assert_eq!(alias_suffix(&reference("~assets/a.png")), "assets/a.png");
        assert_eq!(alias_suffix(&reference("assets/a.png")), "assets/a.png");

        let target = Path::new("/repo");
        let file = Path::new("/repo/src/app/page.tsx");
        let paths = candidates(&reference("@/assets/a.png"), &ctx(target, file));
        assert!(paths.contains(&PathBuf::from("/repo/src/assets/a.png")));
        assert!(paths.contains(&PathBuf::from("/repo/assets/a.png")));
    }

    #[test]
    fn test_rules_cover_both_styles() {
        let root = RULES
            .iter()
            .filter(|r| r.style == PathStyle::RootAbsolute)
            .count();
        let relative = RULES
            .iter()
            .filter(|r| r.style == PathStyle::Relative)
            .count();
        assert_eq!((root, relative), (3, 3));
    }

    #[test]
    fn test_public_usage_suffix_match() {
        let image = Path::new("/repo/apps/web/public/images/logo.png");
        assert!(ends_with_public_usage(image, "images/logo.png"));
        assert!(ends_with_public_usage(image, "logo.png"));
        assert!(!ends_with_public_usage(image, "images/other.png"));
        assert!(!ends_with_public_usage(image, ""));
    }
}
