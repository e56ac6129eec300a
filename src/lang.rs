//! Language detection by file extension.
//!
//! The symbol extractors are shallow and regex-based, so language selection
//! is a coarse tag rather than a full grammar choice. TS/JS variants are
//! coalesced into a single tag because they share one extractor.

/// Languages the symbol extractors understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Java,
    Go,
    /// TypeScript and JavaScript (`.ts`, `.tsx`, `.js`, `.jsx`, `.mjs`, `.cjs`).
    Ts,
    Kotlin,
    CSharp,
    Python,
    Cpp,
    Unknown,
}

impl Lang {
    /// Detect the language from a file extension. Accepts the extension with
    /// or without a leading dot, case-insensitive.
    pub fn from_ext(ext: &str) -> Self {
        let e = ext.trim().to_lowercase();
        if e.is_empty() {
            return Self::Unknown;
        }
        let e = if e.starts_with('.') { e } else { format!(".{e}") };
        match e.as_str() {
            ".java" => Self::Java,
            ".go" => Self::Go,
            ".ts" | ".tsx" | ".js" | ".jsx" | ".mjs" | ".cjs" => Self::Ts,
            ".kt" => Self::Kotlin,
            ".cs" => Self::CSharp,
            ".py" => Self::Python,
            ".cpp" | ".cc" | ".cxx" | ".hpp" | ".hh" | ".h" => Self::Cpp,
            _ => Self::Unknown,
        }
    }

    /// Short tag used for `--lang` filtering and diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Go => "go",
            Self::Ts => "ts",
            Self::Kotlin => "kt",
            Self::CSharp => "cs",
            Self::Python => "py",
            Self::Cpp => "cpp",
            Self::Unknown => "",
        }
    }
}

/// Normalize a `--lang` hint to an extractor tag (`tsx`/`js` collapse to `ts`).
pub fn normalize_lang_hint(hint: &str) -> String {
    match hint.trim().to_lowercase().as_str() {
        "tsx" | "js" | "jsx" | "mjs" | "cjs" => "ts".to_string(),
        other => other.to_string(),
    }
}

/// All language tags the extractors support, for the README.
pub fn supported_langs() -> Vec<&'static str> {
    vec!["cs", "cpp", "go", "java", "kt", "py", "ts", "tsx"]
}

/// Language tags present in a set of manifest paths, derived from extensions.
pub fn present_langs<'a>(paths: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    for p in paths {
        let ext = match p.rsplit_once('.') {
            Some((_, e)) => format!(".{}", e.to_lowercase()),
            None => continue,
        };
        let tag = match ext.as_str() {
            ".go" => "go",
            ".java" => "java",
            ".kt" => "kt",
            ".cs" => "cs",
            ".ts" => "ts",
            ".tsx" => "tsx",
            ".py" => "py",
            ".cpp" | ".cc" | ".cxx" | ".hpp" | ".hh" | ".h" => "cpp",
            _ => continue,
        };
        seen.insert(tag.to_string());
    }
    seen.into_iter().collect()
}

/// Fence language tag for chat bundles, by extension (with dot).
pub fn fence_tag(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        ".go" => "go",
        ".java" => "java",
        ".ts" | ".tsx" | ".js" | ".jsx" | ".mjs" | ".cjs" => "ts",
        ".kt" => "kotlin",
        ".cs" => "csharp",
        ".py" => "python",
        ".md" => "markdown",
        _ => "",
    }
}
