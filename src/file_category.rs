/// Extension based categorization of files.
///
/// A [`CategoryTable`] is an ordered list of categories, each owning a set of
/// lower-case extensions. Lookup walks the list front to back and the first
/// category claiming the extension wins; anything unclaimed lands in the
/// catch-all category.
///
/// # Examples
///
/// ```
/// use dirsort::file_category::CategoryTable;
///
/// let table = CategoryTable::default();
/// assert_eq!(table.resolve("report.pdf"), "Documents");
/// assert_eq!(table.resolve("photo.JPG"), "Images");
/// assert_eq!(table.resolve("unknown.xyz"), "Others");
/// ```
use std::collections::HashSet;
use std::path::Path;

/// Name of the category that receives files no other category claims.
pub const CATCH_ALL: &str = "Others";

/// A named group of extensions mapped to one destination folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// The category name, also used as the folder name.
    pub name: String,
    /// Extensions without the leading dot, lower case, in configured order.
    pub extensions: Vec<String>,
}

impl Category {
    /// Creates a category, normalizing every extension.
    ///
    /// Extensions may be given as `".PDF"` or `"pdf"`; both are stored as `pdf`.
    /// Repeated extensions are kept once.
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| seen.insert(ext.clone()))
            .collect();
        Self {
            name: name.into(),
            extensions,
        }
    }

    /// True if this category claims the (already normalized) extension.
    pub fn claims(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }
}

/// Lower-cases an extension and strips one leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    trimmed
        .strip_prefix('.')
        .unwrap_or(trimmed)
        .to_lowercase()
}

/// Returns the lower-case extension of a file name, or an empty string.
///
/// Follows `Path::extension`: `archive.tar.gz` yields `gz`, while `.bashrc`
/// and `README` have no extension.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// An extension claimed by more than one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionConflict {
    pub extension: String,
    /// The category that wins lookups.
    pub winner: String,
    /// The later category whose claim is shadowed.
    pub shadowed: String,
}

/// Ordered category table with first-match-wins lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Builds a table from categories in evaluation order.
    ///
    /// The catch-all category is appended when the list does not already
    /// contain it, so lookups always have somewhere to land.
    pub fn new(mut categories: Vec<Category>) -> Self {
        if !categories.iter().any(|c| c.name == CATCH_ALL) {
            categories.push(Category::new(CATCH_ALL, Vec::<String>::new()));
        }
        Self { categories }
    }

    /// Categories in evaluation order, catch-all included.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Category names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// True if `name` is one of the configured category names.
    pub fn contains(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c.name == name)
    }

    /// Returns the category for an extension, or the catch-all.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsort::file_category::CategoryTable;
    ///
    /// let table = CategoryTable::default();
    /// assert_eq!(table.category_for_extension("ZIP"), "Archives");
    /// assert_eq!(table.category_for_extension(""), "Others");
    /// ```
    pub fn category_for_extension(&self, extension: &str) -> &str {
        let extension = normalize_extension(extension);
        self.categories
            .iter()
            .find(|c| c.claims(&extension))
            .map(|c| c.name.as_str())
            .unwrap_or(CATCH_ALL)
    }

    /// Returns the category for a file name.
    pub fn resolve(&self, file_name: &str) -> &str {
        self.category_for_extension(&extension_of(file_name))
    }

    /// Lists extensions claimed by more than one category.
    pub fn conflicts(&self) -> Vec<ExtensionConflict> {
        let mut conflicts = Vec::new();
        for (i, category) in self.categories.iter().enumerate() {
            for ext in &category.extensions {
                if let Some(winner) = self.categories[..i].iter().find(|c| c.claims(ext)) {
                    conflicts.push(ExtensionConflict {
                        extension: ext.clone(),
                        winner: winner.name.clone(),
                        shadowed: category.name.clone(),
                    });
                }
            }
        }
        conflicts
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(vec![
            Category::new(
                "Documents",
                [
                    "pdf", "doc", "docx", "txt", "rtf", "odt", "xls", "xlsx", "ppt", "pptx", "csv",
                    "md", "tex",
                ],
            ),
            Category::new(
                "Images",
                [
                    "jpg", "jpeg", "png", "gif", "bmp", "svg", "ico", "tiff", "webp", "heic", "raw",
                ],
            ),
            Category::new(
                "Videos",
                [
                    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg",
                ],
            ),
            Category::new(
                "Audio",
                [
                    "mp3", "wav", "flac", "aac", "ogg", "wma", "m4a", "opus", "aiff",
                ],
            ),
            Category::new(
                "Archives",
                ["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "iso", "dmg"],
            ),
            Category::new(
                "Code",
                [
                    "py", "js", "java", "cpp", "c", "h", "cs", "php", "rb", "go", "rs", "swift",
                    "kt", "html", "css", "sql",
                ],
            ),
            Category::new("Executables", ["exe", "msi", "app", "deb", "rpm", "apk"]),
            Category::new(CATCH_ALL, Vec::<String>::new()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_names() {
        let table = CategoryTable::default();
        let names: Vec<_> = table.names().collect();
        assert_eq!(
            names,
            vec![
                "Documents",
                "Images",
                "Videos",
                "Audio",
                "Archives",
                "Code",
                "Executables",
                "Others"
            ]
        );
    }

    #[test]
    fn test_resolve_known_extensions() {
        let table = CategoryTable::default();
        assert_eq!(table.resolve("report.pdf"), "Documents");
        assert_eq!(table.resolve("song.mp3"), "Audio");
        assert_eq!(table.resolve("main.rs"), "Code");
        assert_eq!(table.resolve("setup.exe"), "Executables");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let table = CategoryTable::default();
        assert_eq!(table.resolve("photo.JPG"), "Images");
        assert_eq!(table.resolve("Movie.MkV"), "Videos");
    }

    #[test]
    fn test_resolve_uses_last_extension() {
        let table = CategoryTable::default();
        assert_eq!(table.resolve("backup.tar.gz"), "Archives");
        assert_eq!(table.resolve("report.final.pdf"), "Documents");
    }

    #[test]
    fn test_unknown_and_missing_extensions_go_to_catch_all() {
        let table = CategoryTable::default();
        assert_eq!(table.resolve("unknown.xyz"), CATCH_ALL);
        assert_eq!(table.resolve("README"), CATCH_ALL);
        assert_eq!(table.resolve(".bashrc"), CATCH_ALL);
    }

    #[test]
    fn test_first_match_wins() {
        let table = CategoryTable::new(vec![
            Category::new("Notes", ["txt"]),
            Category::new("Documents", ["txt", "pdf"]),
        ]);
        assert_eq!(table.resolve("todo.txt"), "Notes");
        assert_eq!(table.resolve("paper.pdf"), "Documents");

        let conflicts = table.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].extension, "txt");
        assert_eq!(conflicts[0].winner, "Notes");
        assert_eq!(conflicts[0].shadowed, "Documents");
    }

    #[test]
    fn test_catch_all_is_always_present() {
        let table = CategoryTable::new(vec![Category::new("Pictures", [".png"])]);
        assert!(table.contains(CATCH_ALL));
        assert_eq!(table.resolve("a.doc"), CATCH_ALL);
        assert_eq!(table.resolve("a.png"), "Pictures");
    }

    #[test]
    fn test_extensions_are_normalized() {
        let category = Category::new("Docs", [".PDF", "pdf", " Txt "]);
        assert_eq!(category.extensions, vec!["pdf", "txt"]);
    }

    #[test]
    fn test_default_table_has_no_conflicts() {
        assert!(CategoryTable::default().conflicts().is_empty());
    }
}
