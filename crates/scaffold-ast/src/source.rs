//! One parsed TypeScript file and the text edits applied to it.

use crate::error::AstError;
use crate::settings::ManipulationSettings;
use crate::syntax::{self, TsNode, TsTree};
use ast_grep_language::SupportLang;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::trace;

/// A replacement of `range` in the file text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub text: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            text: text.into(),
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            text: String::new(),
        }
    }
}

/// Read-only view handed to editors while they compute edits.
pub struct FileView<'a> {
    pub path: &'a Path,
    pub text: &'a str,
    pub root: TsNode<'a>,
    pub settings: &'a ManipulationSettings,
}

impl FileView<'_> {
    pub fn indent_at(&self, offset: usize) -> String {
        syntax::indent_at(self.text, offset)
    }

    pub fn shape_error(&self, detail: impl Into<String>) -> AstError {
        AstError::shape(self.path, detail)
    }
}

pub struct SourceFile {
    path: PathBuf,
    lang: SupportLang,
    text: String,
    tree: TsTree,
    disk: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let text = text.into();
        let lang = syntax::language_for(&path);
        let tree = syntax::parse(&text, lang);
        Self {
            path,
            lang,
            text,
            tree,
            disk: None,
        }
    }

    /// A file whose text matches what is on disk.
    pub fn loaded(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let mut file = Self::new(path, text);
        file.disk = Some(file.text.clone());
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> TsNode<'_> {
        self.tree.root()
    }

    pub fn is_modified(&self) -> bool {
        self.disk.as_deref() != Some(self.text.as_str())
    }

    pub fn is_new(&self) -> bool {
        self.disk.is_none()
    }

    pub fn disk_text(&self) -> Option<&str> {
        self.disk.as_deref()
    }

    pub(crate) fn set_disk_text(&mut self, text: String) {
        self.disk = Some(text);
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.disk = Some(self.text.clone());
    }

    pub fn syntax_error(&self) -> Option<(usize, usize)> {
        syntax::first_error(&self.root()).map(|offset| syntax::line_col(&self.text, offset))
    }

    /// Compute edits against the current tree and apply them.
    ///
    /// Returns whether the text changed.
    pub fn modify<F>(&mut self, settings: &ManipulationSettings, f: F) -> Result<bool, AstError>
    where
        F: FnOnce(&FileView<'_>) -> Result<Vec<TextEdit>, AstError>,
    {
        let edits = {
            let view = FileView {
                path: &self.path,
                text: &self.text,
                root: self.tree.root(),
                settings,
            };
            f(&view)?
        };
        self.apply(edits)
    }

    pub fn apply(&mut self, mut edits: Vec<TextEdit>) -> Result<bool, AstError> {
        edits.retain(|e| !(e.range.is_empty() && e.text.is_empty()));
        if edits.is_empty() {
            return Ok(false);
        }

        edits.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then(a.range.end.cmp(&b.range.end))
        });
        for pair in edits.windows(2) {
            if pair[0].range.end > pair[1].range.start {
                return Err(AstError::OverlappingEdits(self.path.clone()));
            }
        }

        let before = self.text.clone();
        for edit in edits.iter().rev() {
            if edit.range.end > self.text.len() {
                return Err(AstError::shape(&self.path, "edit past end of file"));
            }
            self.text.replace_range(edit.range.clone(), &edit.text);
        }
        trace!("Applied {} edits to {}", edits.len(), self.path.display());
        self.reparse();
        Ok(self.text != before)
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.reparse();
    }

    fn reparse(&mut self) {
        self.tree = syntax::parse(&self.text, self.lang);
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("path", &self.path)
            .field("modified", &self.is_modified())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_edits_in_any_order() {
        let mut file = SourceFile::new("/p/a.ts", "const a = 1;\nconst b = 2;\n");
        let changed = file
            .apply(vec![
                TextEdit::insert(0, "// head\n"),
                TextEdit::replace(23..24, "3"),
            ])
            .unwrap();
        assert!(changed);
        assert_eq!(file.text(), "// head\nconst a = 1;\nconst b = 3;\n");
        assert_eq!(file.root().kind(), "program");
    }

    #[test]
    fn test_overlapping_edits_are_rejected() {
        let mut file = SourceFile::new("/p/a.ts", "const a = 1;");
        let err = file
            .apply(vec![
                TextEdit::replace(0..5, "let"),
                TextEdit::replace(3..8, "x"),
            ])
            .unwrap_err();
        assert!(matches!(err, AstError::OverlappingEdits(_)));
        assert_eq!(file.text(), "const a = 1;");
    }

    #[test]
    fn test_modified_tracking() {
        let mut file = SourceFile::loaded("/p/a.ts", "let a = 1;");
        assert!(!file.is_modified());
        file.modify(&ManipulationSettings::default(), |view| {
            let decl = syntax::find_declaration(&view.root, "a").unwrap();
            Ok(vec![TextEdit::replace(decl.name_node.range(), "b")])
        })
        .unwrap();
        assert_eq!(file.text(), "let b = 1;");
        assert!(file.is_modified());
        file.mark_persisted();
        assert!(!file.is_modified());
        assert!(SourceFile::new("/p/b.ts", "").is_new());
    }

    #[test]
    fn test_tsx_files_use_tsx_grammar() {
        let file = SourceFile::new("/p/index.tsx", "export const A = () => <div>hi</div>;\n");
        assert!(file.syntax_error().is_none());
    }
}
