//! Delta computation between two snapshots.
//!
//! Classification runs in four passes: removed/changed, added, exact
//! renames (same content hash, one-to-one), and an optional
//! similarity-based rename pass driven by 64-bit SimHash over normalized
//! token lines. All output slices are sorted for reproducible archives.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::snapshot::{SnapFile, Snapshot};

/// A rename pairing detected by hash identity or similarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedFile {
    pub from: String,
    pub to: String,
    pub hash: String,
}

/// A changed file. `diff_path` and `oversize` are filled during patch
/// generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    #[serde(rename = "hashBefore")]
    pub hash_before: String,
    #[serde(rename = "hashAfter")]
    pub hash_after: String,
    #[serde(rename = "diff")]
    pub diff_path: String,
    pub oversize: bool,
}

/// The minimal change set between two snapshots. After rename
/// de-duplication, a path in `renamed.to` never appears in `added` and a
/// path in `renamed.from` never appears in `removed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    pub added: Vec<SnapFile>,
    pub removed: Vec<SnapFile>,
    pub renamed: Vec<RenamedFile>,
    pub changed: Vec<ChangedFile>,
}

/// Provides file contents for the similarity pass. `old == true` reads
/// from the previous tree (removed paths), `old == false` from the current
/// tree (added paths).
pub trait ContentProvider {
    fn read(&self, path: &str, old: bool) -> io::Result<Vec<u8>>;
}

/// A [`ContentProvider`] reading from two directory roots.
#[derive(Debug, Clone)]
pub struct DualTreeProvider {
    pub old_root: PathBuf,
    pub new_root: PathBuf,
}

impl ContentProvider for DualTreeProvider {
    fn read(&self, path: &str, old: bool) -> io::Result<Vec<u8>> {
        let root = if old { &self.old_root } else { &self.new_root };
        std::fs::read(root.join(path))
    }
}

/// Similarity pass configuration; absent means the pass is skipped.
pub struct SimilarityOptions<'a> {
    /// Maximum Hamming distance between SimHashes to classify as a rename.
    pub threshold: u32,
    pub provider: &'a dyn ContentProvider,
}

/// Options for delta computation, threaded explicitly.
#[derive(Default)]
pub struct DeltaOptions<'a> {
    pub similarity: Option<SimilarityOptions<'a>>,
}

/// Compute the change set between two snapshots.
pub fn build_delta(prev: &Snapshot, curr: &Snapshot, opts: &DeltaOptions) -> Delta {
    let mut d = Delta::default();

    // Degenerate cases.
    if curr.files.is_empty() {
        d.removed = prev.files.clone();
        d.removed.sort_by(|a, b| a.path.cmp(&b.path));
        return d;
    }
    if prev.files.is_empty() {
        d.added = curr.files.clone();
        d.added.sort_by(|a, b| a.path.cmp(&b.path));
        return d;
    }

    let by_path_prev: BTreeMap<&str, &SnapFile> =
        prev.files.iter().map(|f| (f.path.as_str(), f)).collect();
    let by_path_curr: BTreeMap<&str, &SnapFile> =
        curr.files.iter().map(|f| (f.path.as_str(), f)).collect();

    // 1) Removed / Changed.
    for (path, pf) in &by_path_prev {
        match by_path_curr.get(path) {
            None => d.removed.push((*pf).clone()),
            Some(cf) if pf.hash != cf.hash => d.changed.push(ChangedFile {
                path: (*path).to_string(),
                hash_before: pf.hash.clone(),
                hash_after: cf.hash.clone(),
                diff_path: String::new(),
                oversize: false,
            }),
            Some(_) => {}
        }
    }

    // 2) Added.
    for (path, cf) in &by_path_curr {
        if !by_path_prev.contains_key(path) {
            d.added.push((*cf).clone());
        }
    }

    // 3) Exact renames: index removed by hash, candidate lists sorted by
    // source path; consume one-to-one in added path order.
    let mut by_hash_removed: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for rf in &d.removed {
        by_hash_removed
            .entry(rf.hash.as_str())
            .or_default()
            .push(rf.path.clone());
    }
    for paths in by_hash_removed.values_mut() {
        paths.sort();
    }

    d.added.sort_by(|a, b| a.path.cmp(&b.path));
    for af in &d.added {
        let Some(candidates) = by_hash_removed.get_mut(af.hash.as_str()) else {
            continue;
        };
        if candidates.is_empty() {
            continue;
        }
        let from = candidates.remove(0);
        d.renamed.push(RenamedFile {
            from,
            to: af.path.clone(),
            hash: af.hash.clone(),
        });
    }

    // 4) Drop renamed endpoints from added/removed.
    if !d.renamed.is_empty() {
        let from: HashSet<&str> = d.renamed.iter().map(|r| r.from.as_str()).collect();
        let to: HashSet<&str> = d.renamed.iter().map(|r| r.to.as_str()).collect();
        d.added.retain(|a| !to.contains(a.path.as_str()));
        d.removed.retain(|r| !from.contains(r.path.as_str()));
    }

    if let Some(sim) = &opts.similarity {
        apply_similarity_renames(&mut d, sim);
    }

    // 5) Final deterministic ordering.
    d.added.sort_by(|a, b| a.path.cmp(&b.path));
    d.removed.sort_by(|a, b| a.path.cmp(&b.path));
    d.changed.sort_by(|a, b| a.path.cmp(&b.path));
    d.renamed
        .sort_by(|a, b| (a.from.as_str(), a.to.as_str()).cmp(&(b.from.as_str(), b.to.as_str())));
    d
}

/// Match remaining removed x added pairs by SimHash Hamming distance,
/// consuming pairs deterministically (sorted by target path, then score,
/// then source path).
fn apply_similarity_renames(d: &mut Delta, sim: &SimilarityOptions) {
    if d.removed.is_empty() || d.added.is_empty() {
        return;
    }

    // Line-count ratio prefilter: the larger side at most 2x the smaller,
    // unknown counts always kept.
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for i in 0..d.removed.len() {
        for j in 0..d.added.len() {
            let (ra, aa) = (d.removed[i].lines, d.added[j].lines);
            if ra == 0 || aa == 0 {
                pairs.push((i, j));
                continue;
            }
            let (big, small) = if ra > aa { (ra, aa) } else { (aa, ra) };
            if big <= 2 * small {
                pairs.push((i, j));
            }
        }
    }
    if pairs.is_empty() {
        return;
    }

    let mut removed_hashes: HashMap<usize, Option<u64>> = HashMap::new();
    let mut added_hashes: HashMap<usize, Option<u64>> = HashMap::new();
    let mut hash_of = |idx: usize, old: bool, d: &Delta| -> Option<u64> {
        let cache = if old { &mut removed_hashes } else { &mut added_hashes };
        if let Some(v) = cache.get(&idx) {
            return *v;
        }
        let path = if old {
            d.removed[idx].path.as_str()
        } else {
            d.added[idx].path.as_str()
        };
        let value = sim
            .provider
            .read(path, old)
            .ok()
            .map(|data| sim_hash64(&normalize_for_sim(&String::from_utf8_lossy(&data))));
        cache.insert(idx, value);
        value
    };

    struct Scored {
        i: usize,
        j: usize,
        score: u32,
    }
    let mut scored: Vec<Scored> = Vec::new();
    for (i, j) in pairs {
        let (Some(ha), Some(hb)) = (hash_of(i, true, d), hash_of(j, false, d)) else {
            continue;
        };
        let dist = hamming64(ha, hb);
        if dist <= sim.threshold {
            scored.push(Scored { i, j, score: dist });
        }
    }
    if scored.is_empty() {
        return;
    }

    scored.sort_by(|a, b| {
        (d.added[a.j].path.as_str(), a.score, d.removed[a.i].path.as_str()).cmp(&(
            d.added[b.j].path.as_str(),
            b.score,
            d.removed[b.i].path.as_str(),
        ))
    });

    let mut used_removed: HashSet<usize> = HashSet::new();
    let mut used_added: HashSet<usize> = HashSet::new();
    let mut renames: Vec<RenamedFile> = Vec::new();
    for s in &scored {
        if used_removed.contains(&s.i) || used_added.contains(&s.j) {
            continue;
        }
        used_removed.insert(s.i);
        used_added.insert(s.j);
        renames.push(RenamedFile {
            from: d.removed[s.i].path.clone(),
            to: d.added[s.j].path.clone(),
            hash: d.added[s.j].hash.clone(),
        });
    }
    if renames.is_empty() {
        return;
    }

    let mut idx = 0;
    d.removed.retain(|_| {
        let keep = !used_removed.contains(&idx);
        idx += 1;
        keep
    });
    idx = 0;
    d.added.retain(|_| {
        let keep = !used_added.contains(&idx);
        idx += 1;
        keep
    });
    d.renamed.extend(renames);
}

/// Trim each line, collapse internal whitespace to single spaces, and drop
/// empty lines.
pub fn normalize_for_sim(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// 64-bit SimHash over FNV-1a token hashes: for each bit position a signed
/// counter is incremented when the bit is set and decremented otherwise;
/// the output bit is 1 iff the counter is >= 0.
pub fn sim_hash64(lines: &[String]) -> u64 {
    let mut counters = [0i64; 64];
    for line in lines {
        for token in line
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a64(token.as_bytes());
            for (b, counter) in counters.iter_mut().enumerate() {
                if (h >> b) & 1 == 1 {
                    *counter += 1;
                } else {
                    *counter -= 1;
                }
            }
        }
    }
    let mut out = 0u64;
    for (b, counter) in counters.iter().enumerate() {
        if *counter >= 0 {
            out |= 1 << b;
        }
    }
    out
}

/// Hamming distance between two 64-bit hashes.
pub fn hamming64(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

fn fnv1a64(data: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut h = OFFSET;
    for &byte in data {
        h ^= byte as u64;
        h = h.wrapping_mul(PRIME);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(files: Vec<(&str, &str)>) -> Snapshot {
        snap_with_lines(files.into_iter().map(|(p, h)| (p, h, 10)).collect())
    }

    fn snap_with_lines(files: Vec<(&str, &str, usize)>) -> Snapshot {
        Snapshot {
            module: "m".into(),
            files: files
                .into_iter()
                .map(|(p, h, lines)| SnapFile {
                    path: p.into(),
                    hash: h.into(),
                    lines,
                })
                .collect(),
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_degenerate_all_added_and_all_removed() {
        let empty = Snapshot::default();
        let full = snap(vec![("b.go", "h2"), ("a.go", "h1")]);

        let d = build_delta(&empty, &full, &DeltaOptions::default());
        let added: Vec<_> = d.added.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(added, vec!["a.go", "b.go"]);
        assert!(d.removed.is_empty() && d.changed.is_empty() && d.renamed.is_empty());

        let d = build_delta(&full, &empty, &DeltaOptions::default());
        let removed: Vec<_> = d.removed.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(removed, vec!["a.go", "b.go"]);
    }

    #[test]
    fn test_changed_detection_carries_both_hashes() {
        let prev = snap(vec![("a.go", "h1")]);
        let curr = snap(vec![("a.go", "h2")]);
        let d = build_delta(&prev, &curr, &DeltaOptions::default());
        assert_eq!(d.changed.len(), 1);
        assert_eq!(d.changed[0].path, "a.go");
        assert_eq!(d.changed[0].hash_before, "h1");
        assert_eq!(d.changed[0].hash_after, "h2");
        assert!(d.added.is_empty() && d.removed.is_empty());
    }

    #[test]
    fn test_exact_rename_consumes_added_and_removed() {
        let prev = snap(vec![("A.go", "h1"), ("B.go", "h2")]);
        let curr = snap(vec![("A.go", "h1"), ("C.go", "h2")]);
        let d = build_delta(&prev, &curr, &DeltaOptions::default());
        assert_eq!(
            d.renamed,
            vec![RenamedFile {
                from: "B.go".into(),
                to: "C.go".into(),
                hash: "h2".into()
            }]
        );
        assert!(d.added.is_empty());
        assert!(d.removed.is_empty());
        assert!(d.changed.is_empty());
    }

    #[test]
    fn test_exact_rename_is_one_to_one() {
        // Two removed files share a hash; only one rename per added file.
        let prev = snap(vec![("x/one.go", "h"), ("x/two.go", "h")]);
        let curr = snap(vec![("y/one.go", "h")]);
        let d = build_delta(&prev, &curr, &DeltaOptions::default());
        assert_eq!(d.renamed.len(), 1);
        // The lexicographically first removed path is consumed.
        assert_eq!(d.renamed[0].from, "x/one.go");
        assert_eq!(d.removed.len(), 1);
        assert_eq!(d.removed[0].path, "x/two.go");
    }

    struct MapProvider {
        old: std::collections::HashMap<String, Vec<u8>>,
        new: std::collections::HashMap<String, Vec<u8>>,
    }

    impl ContentProvider for MapProvider {
        fn read(&self, path: &str, old: bool) -> io::Result<Vec<u8>> {
            let m = if old { &self.old } else { &self.new };
            m.get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }
    }

    #[test]
    fn test_similarity_rename_within_threshold() {
        // Same token stream, different whitespace: the normalized lines are
        // identical, so the SimHash distance is exactly 0.
        let body_old = "export function handler(req, res) {\n  res.send(42);\n}\n";
        let body_new = "export  function handler(req,  res) {\n\tres.send(42);\n}\n\n";
        let prev = snap_with_lines(vec![("old/x.ts", "h1", 3)]);
        let curr = snap_with_lines(vec![("new/x.ts", "h2", 4)]);

        let provider = MapProvider {
            old: [("old/x.ts".to_string(), body_old.as_bytes().to_vec())]
                .into_iter()
                .collect(),
            new: [("new/x.ts".to_string(), body_new.as_bytes().to_vec())]
                .into_iter()
                .collect(),
        };
        let opts = DeltaOptions {
            similarity: Some(SimilarityOptions {
                threshold: 8,
                provider: &provider,
            }),
        };
        let d = build_delta(&prev, &curr, &opts);
        assert_eq!(
            d.renamed,
            vec![RenamedFile {
                from: "old/x.ts".into(),
                to: "new/x.ts".into(),
                hash: "h2".into()
            }]
        );
        assert!(d.added.is_empty() && d.removed.is_empty() && d.changed.is_empty());
    }

    #[test]
    fn test_similarity_skipped_without_provider() {
        let prev = snap(vec![("old/x.ts", "h1")]);
        let curr = snap(vec![("new/x.ts", "h2")]);
        let d = build_delta(&prev, &curr, &DeltaOptions::default());
        assert!(d.renamed.is_empty());
        assert_eq!(d.added.len(), 1);
        assert_eq!(d.removed.len(), 1);
    }

    #[test]
    fn test_similarity_ratio_prefilter() {
        // 100 lines vs 10 lines: larger > 2x smaller, pair not considered.
        let prev = snap_with_lines(vec![("a.ts", "h1", 100)]);
        let curr = snap_with_lines(vec![("b.ts", "h2", 10)]);
        let provider = MapProvider {
            old: Default::default(),
            new: Default::default(),
        };
        let opts = DeltaOptions {
            similarity: Some(SimilarityOptions {
                threshold: 64,
                provider: &provider,
            }),
        };
        let d = build_delta(&prev, &curr, &opts);
        assert!(d.renamed.is_empty());
    }

    #[test]
    fn test_delta_completeness_invariant() {
        let prev = snap(vec![
            ("same.go", "s"),
            ("gone.go", "g"),
            ("mod.go", "m1"),
            ("moved.go", "mv"),
        ]);
        let curr = snap(vec![
            ("same.go", "s"),
            ("mod.go", "m2"),
            ("fresh.go", "f"),
            ("moved2.go", "mv"),
        ]);
        let d = build_delta(&prev, &curr, &DeltaOptions::default());

        let mut curr_paths: Vec<&str> = d
            .added
            .iter()
            .map(|f| f.path.as_str())
            .chain(d.renamed.iter().map(|r| r.to.as_str()))
            .chain(d.changed.iter().map(|c| c.path.as_str()))
            .chain(std::iter::once("same.go"))
            .collect();
        curr_paths.sort();
        let mut expected: Vec<&str> = curr.files.iter().map(|f| f.path.as_str()).collect();
        expected.sort();
        assert_eq!(curr_paths, expected);

        // Rename exclusivity.
        for r in &d.renamed {
            assert!(!d.added.iter().any(|a| a.path == r.to));
            assert!(!d.removed.iter().any(|x| x.path == r.from));
        }
    }

    #[test]
    fn test_simhash_symmetry_and_identity() {
        let a = sim_hash64(&normalize_for_sim("let a = 1;\nlet b = 2;\n"));
        let b = sim_hash64(&normalize_for_sim("   let a = 1;\n\nlet  b =  2;\n"));
        // Whitespace normalization makes the inputs identical.
        assert_eq!(a, b);
        assert_eq!(hamming64(a, b), 0);

        let c = sim_hash64(&normalize_for_sim("something entirely different"));
        assert_eq!(hamming64(a, c), hamming64(c, a));
    }

    #[test]
    fn test_fnv1a64_constants() {
        // FNV-1a with 64-bit offset basis hashes the empty input to the
        // offset itself.
        assert_eq!(fnv1a64(b""), 0xcbf29ce484222325);
        assert_ne!(fnv1a64(b"a"), fnv1a64(b"b"));
    }
}
