//! Name-derived content-type classification.
//!
//! # Responsibility
//! - Map a record name to a language/category tag via a fixed table.
//!
//! # Invariants
//! - Pure lookup: same name always yields the same tag.
//! - Unrecognized names fall back to [`FALLBACK_LANGUAGE`].

/// Tag returned when no table entry matches.
pub const FALLBACK_LANGUAGE: &str = "plaintext";

const EXACT_NAMES: &[(&str, &str)] = &[
    ("dockerfile", "dockerfile"),
    ("makefile", "makefile"),
    ("cargo.lock", "toml"),
    (".gitignore", "ignore"),
    (".env", "dotenv"),
];

const EXTENSIONS: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("py", "python"),
    ("go", "go"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("rb", "ruby"),
    ("php", "php"),
    ("swift", "swift"),
    ("html", "html"),
    ("htm", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("json", "json"),
    ("toml", "toml"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("xml", "xml"),
    ("md", "markdown"),
    ("markdown", "markdown"),
    ("sql", "sql"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("txt", "plaintext"),
];

/// Returns the language tag for a record name (path allowed).
///
/// Matching is case-insensitive and only considers the last path segment.
pub fn classify_name(name: &str) -> &'static str {
    let file_name = name.rsplit('/').next().unwrap_or(name).to_ascii_lowercase();

    if let Some((_, tag)) = EXACT_NAMES.iter().find(|(exact, _)| *exact == file_name) {
        return *tag;
    }

    let extension = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => return FALLBACK_LANGUAGE,
    };

    EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map_or(FALLBACK_LANGUAGE, |(_, tag)| *tag)
}
