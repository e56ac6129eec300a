//! Build metadata detection (Maven / Gradle / Go / Node).
//!
//! Best-effort probing of common build files in the project root. Partial
//! or absent files are tolerated, and detection fills manifest fields only
//! where they are still unset. Priority for the build kind: Maven > Gradle
//! > Go > Node.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::index::Manifest;

/// Minimal summary of build metadata.
#[derive(Debug, Clone, Default)]
pub struct BuildInfo {
    /// "maven" | "gradle" | "go" | "node" | "" (unknown).
    pub build: String,
    /// Normalized JDK major version, e.g. "21", "17".
    pub jdk: String,
    /// Artifact/module/package name.
    pub module: String,
    pub entrypoints: Vec<String>,
    pub source_globs: Vec<String>,
}

/// Probe `root` for build metadata.
pub fn detect(root: &Path) -> BuildInfo {
    if let Some(p) = first_existing(root, &["pom.xml"]) {
        if let Some(info) = detect_maven(root, &p) {
            return info;
        }
    }
    if let Some(p) = first_existing(root, &["build.gradle", "build.gradle.kts"]) {
        if let Some(info) = detect_gradle(root, &p) {
            return info;
        }
    }
    if let Some(p) = first_existing(root, &["go.mod"]) {
        if let Some(info) = detect_go(root, &p) {
            return info;
        }
    }
    if let Some(p) = first_existing(root, &["package.json"]) {
        if let Some(info) = detect_node(root, &p) {
            return info;
        }
    }
    BuildInfo::default()
}

/// Merge detected info into the manifest without overriding fields already
/// set upstream.
pub fn apply_to_manifest(info: &BuildInfo, man: &mut Manifest) {
    if man.build.is_empty() && !info.build.is_empty() {
        man.build = info.build.clone();
    }
    if man.jdk.is_empty() && !info.jdk.is_empty() {
        man.jdk = info.jdk.clone();
    }
    if man.module.is_empty() && !info.module.is_empty() {
        man.module = info.module.clone();
    }
    if man.entrypoints.is_empty() && !info.entrypoints.is_empty() {
        man.entrypoints = info.entrypoints.clone();
    }
    if man.source_globs.is_empty() && !info.source_globs.is_empty() {
        man.source_globs = info.source_globs.clone();
    }
}

// --- Maven -----------------------------------------------------------------

static RE_POM_PARENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<parent>.*?</parent>").unwrap());
static RE_POM_ARTIFACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<artifactId>\s*([^<]+?)\s*</artifactId>").unwrap());
static RE_POM_JDK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<(?:maven\.compiler\.release|maven\.compiler\.target|maven\.compiler\.source|java\.version)>\s*([^<]+?)\s*</",
    )
    .unwrap()
});

fn detect_maven(root: &Path, pom_path: &Path) -> Option<BuildInfo> {
    let text = fs::read_to_string(pom_path).ok()?;
    // The <parent> block carries its own artifactId; strip it so the
    // project's own coordinates win.
    let own = RE_POM_PARENT.replace(&text, "");

    let artifact = RE_POM_ARTIFACT
        .captures(&own)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();
    let jdk = RE_POM_JDK
        .captures(&text)
        .map(|c| normalize_jdk(c[1].trim()))
        .unwrap_or_default();

    let module = if artifact.is_empty() {
        dir_name(root)
    } else {
        artifact
    };
    Some(BuildInfo {
        build: "maven".into(),
        jdk,
        module,
        entrypoints: Vec::new(),
        source_globs: vec![
            "src/main/java/**/*.java".into(),
            "src/test/java/**/*.java".into(),
        ],
    })
}

// --- Gradle ----------------------------------------------------------------

static RE_GRADLE_COMPAT_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*(?:sourceCompatibility|targetCompatibility)\s*=\s*["']?(\d{1,2})["']?"#)
        .unwrap()
});
static RE_GRADLE_COMPAT_ENUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:sourceCompatibility|targetCompatibility)\s*=\s*JavaVersion\.VERSION_(\d{1,2})")
        .unwrap()
});
static RE_GRADLE_ROOT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*rootProject\.name\s*=\s*["']([^"']+)["']"#).unwrap()
});

fn detect_gradle(root: &Path, build_path: &Path) -> Option<BuildInfo> {
    let text = fs::read_to_string(build_path).ok()?;

    let mut jdk = RE_GRADLE_COMPAT_QUOTED
        .captures(&text)
        .or_else(|| RE_GRADLE_COMPAT_ENUM.captures(&text))
        .map(|c| normalize_jdk(&c[1]))
        .unwrap_or_default();
    if jdk.is_empty() {
        if let Some(p) = first_existing(root, &["gradle.properties"]) {
            jdk = scan_gradle_properties(&p);
        }
    }

    let mut module = String::new();
    if let Some(p) = first_existing(root, &["settings.gradle", "settings.gradle.kts"]) {
        if let Ok(settings) = fs::read_to_string(&p) {
            if let Some(caps) = RE_GRADLE_ROOT_NAME.captures(&settings) {
                module = caps[1].to_string();
            }
        }
    }
    if module.is_empty() {
        module = dir_name(root);
    }

    Some(BuildInfo {
        build: "gradle".into(),
        jdk,
        module,
        entrypoints: Vec::new(),
        source_globs: vec![
            "src/main/java/**/*.java".into(),
            "src/test/java/**/*.java".into(),
            "src/main/kotlin/**/*.kt".into(),
            "src/test/kotlin/**/*.kt".into(),
        ],
    })
}

fn scan_gradle_properties(path: &Path) -> String {
    let Ok(text) = fs::read_to_string(path) else {
        return String::new();
    };
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if matches!(key.trim(), "org.gradle.java.home" | "java.version" | "jdk") {
            let v = normalize_jdk(value.trim());
            if !v.is_empty() {
                return v;
            }
        }
    }
    String::new()
}

// --- Go --------------------------------------------------------------------

fn detect_go(root: &Path, mod_path: &Path) -> Option<BuildInfo> {
    let text = fs::read_to_string(mod_path).ok()?;
    let module = text
        .lines()
        .find_map(|line| line.trim().strip_prefix("module "))
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| dir_name(root));
    Some(BuildInfo {
        build: "go".into(),
        jdk: String::new(),
        module,
        entrypoints: Vec::new(),
        source_globs: vec!["**/*.go".into()],
    })
}

// --- Node ------------------------------------------------------------------

fn detect_node(root: &Path, pkg_path: &Path) -> Option<BuildInfo> {
    let data = fs::read(pkg_path).ok()?;
    let obj: serde_json::Value = serde_json::from_slice(&data).ok()?;

    let str_field = |key: &str| {
        obj.get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let name = str_field("name");
    // Prefer the ESM entry, then the CJS one.
    let entry = {
        let module = str_field("module");
        if module.is_empty() {
            str_field("main")
        } else {
            module
        }
    };

    Some(BuildInfo {
        build: "node".into(),
        jdk: String::new(),
        module: if name.is_empty() { dir_name(root) } else { name },
        entrypoints: if entry.is_empty() { Vec::new() } else { vec![entry] },
        source_globs: vec![
            "src/**/*.{ts,tsx,js,jsx}".into(),
            "lib/**/*.{ts,tsx,js,jsx}".into(),
        ],
    })
}

// --- helpers ---------------------------------------------------------------

fn first_existing(root: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|n| root.join(n))
        .find(|p| p.is_file())
}

fn dir_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Coerce inputs like "1.8", "17.0.1", "21" into a bare major version.
fn normalize_jdk(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        return String::new();
    }
    if let Some(rest) = s.strip_prefix("1.") {
        if !rest.is_empty() {
            return rest.to_string();
        }
    }
    s.chars().take_while(|c| c.is_ascii_digit()).collect()
}
