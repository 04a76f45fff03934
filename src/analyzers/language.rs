use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

static EXTENSION_LANGUAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| HashMap::from([
    ("py", "python"), ("pyi", "python"),
    ("js", "javascript"), ("jsx", "javascript"), ("mjs", "javascript"), ("cjs", "javascript"),
    ("ts", "typescript"), ("tsx", "typescript"),
    ("c", "c"),
    ("cpp", "cpp"), ("cc", "cpp"), ("cxx", "cpp"), ("h", "cpp"), ("hpp", "cpp"), ("hh", "cpp"),
    ("cs", "csharp"),
    ("php", "php"),
    ("rs", "rust"),
    ("go", "go"),
    ("java", "java"),
    ("swift", "swift"),
    ("kt", "kotlin"), ("kts", "kotlin"),
    ("rb", "ruby"),
    ("sh", "bash"), ("bash", "bash"),
]));

pub const FALLBACK_LANGUAGE: &str = "text";

/// Highlighting tag for a path, by extension only.
pub fn detect_language(path: &str) -> &'static str {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .and_then(|e| EXTENSION_LANGUAGES.get(e.as_str()).copied())
        .unwrap_or(FALLBACK_LANGUAGE)
}
