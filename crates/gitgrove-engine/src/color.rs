use gitgrove_core::{CommitEvent, FileCategory, Rgb};
use std::collections::{BTreeMap, HashMap};

const REPO_PALETTE: [Rgb; 12] = [
    Rgb::new(0x4e, 0xa8, 0xde),
    Rgb::new(0xf2, 0x8e, 0x2b),
    Rgb::new(0x59, 0xc2, 0x6b),
    Rgb::new(0xe1, 0x57, 0x59),
    Rgb::new(0xb0, 0x7a, 0xe8),
    Rgb::new(0xed, 0xc9, 0x48),
    Rgb::new(0x76, 0xd7, 0xc4),
    Rgb::new(0xff, 0x9d, 0xa7),
    Rgb::new(0x9c, 0x75, 0x5f),
    Rgb::new(0x8c, 0xd1, 0x7d),
    Rgb::new(0x5d, 0x6d, 0xe0),
    Rgb::new(0xba, 0xb0, 0xac),
];

pub const DELETED_COLOR: Rgb = Rgb::new(0x80, 0x80, 0x80);

pub fn category_color(category: FileCategory) -> Rgb {
    match category {
        FileCategory::Code => Rgb::new(0x3b, 0x82, 0xf6),
        FileCategory::Web => Rgb::new(0xf5, 0x9e, 0x0b),
        FileCategory::Style => Rgb::new(0xec, 0x48, 0x99),
        FileCategory::Markup => Rgb::new(0xf9, 0x73, 0x16),
        FileCategory::Config => Rgb::new(0x84, 0xcc, 0x16),
        FileCategory::Data => Rgb::new(0x06, 0xb6, 0xd4),
        FileCategory::Docs => Rgb::new(0xa3, 0xa3, 0xa3),
        FileCategory::Image => Rgb::new(0xa8, 0x55, 0xf7),
        FileCategory::Build => Rgb::new(0xef, 0x44, 0x44),
        FileCategory::Test => Rgb::new(0x10, 0xb9, 0x81),
        FileCategory::Other => Rgb::new(0x64, 0x74, 0x8b),
    }
}

/// Lowercased extension of the last path segment, if any.
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn is_test_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    if name.contains(".test.") || name.contains(".spec.") || name.contains("_test.") {
        return true;
    }
    lower
        .split('/')
        .rev()
        .skip(1)
        .any(|segment| segment == "tests" || segment == "__tests__")
}

pub fn categorize(path: &str) -> FileCategory {
    if is_test_path(path) {
        return FileCategory::Test;
    }

    let name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    match name.as_str() {
        "makefile" | "dockerfile" | "cmakelists.txt" | "build.gradle" | "justfile" => {
            return FileCategory::Build
        }
        "license" | "readme" | "changelog" | "authors" => return FileCategory::Docs,
        _ => {}
    }

    let Some(ext) = extension(path) else {
        return FileCategory::Other;
    };
    match ext.as_str() {
        "rs" | "go" | "py" | "rb" | "java" | "kt" | "c" | "h" | "cc" | "cpp" | "hpp" | "cs"
        | "swift" | "m" | "scala" | "hs" | "ex" | "exs" | "erl" | "clj" | "lua" | "zig" | "php"
        | "sh" | "bash" => FileCategory::Code,
        "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" | "vue" | "svelte" => FileCategory::Web,
        "css" | "scss" | "sass" | "less" => FileCategory::Style,
        "html" | "htm" | "xml" | "svg" => FileCategory::Markup,
        "toml" | "yaml" | "yml" | "ini" | "cfg" | "conf" | "env" | "lock" => FileCategory::Config,
        "json" | "csv" | "tsv" | "sql" | "parquet" | "proto" => FileCategory::Data,
        "md" | "mdx" | "rst" | "txt" | "adoc" => FileCategory::Docs,
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "ico" | "bmp" => FileCategory::Image,
        "gradle" | "cmake" | "mk" | "bazel" | "bzl" | "nix" => FileCategory::Build,
        _ => FileCategory::Other,
    }
}

/// Repository and file colouring for one engine instance.
#[derive(Debug, Clone, Default)]
pub struct ColorTable {
    repos: Vec<(String, Rgb)>,
    repo_index: HashMap<String, usize>,
    extension_overrides: HashMap<String, Rgb>,
}

impl ColorTable {
    pub fn new(extension_colors: &BTreeMap<String, String>) -> Self {
        let mut extension_overrides = HashMap::new();
        for (ext, hex) in extension_colors {
            match Rgb::from_hex(hex) {
                Some(color) => {
                    extension_overrides
                        .insert(ext.trim_start_matches('.').to_ascii_lowercase(), color);
                }
                None => tracing::warn!(extension = %ext, value = %hex, "ignoring malformed extension color"),
            }
        }
        Self {
            repos: Vec::new(),
            repo_index: HashMap::new(),
            extension_overrides,
        }
    }

    /// Assigns palette colours round-robin in first-seen order of `events`.
    pub fn assign_repos(&mut self, events: &[CommitEvent]) {
        self.repos.clear();
        self.repo_index.clear();
        for event in events {
            self.ensure_repo(&event.repo_id);
        }
    }

    fn ensure_repo(&mut self, repo_id: &str) -> Rgb {
        if let Some(&i) = self.repo_index.get(repo_id) {
            return self.repos[i].1;
        }
        let order = self.repos.len();
        let color = REPO_PALETTE[order % REPO_PALETTE.len()];
        self.repos.push((repo_id.to_string(), color));
        self.repo_index.insert(repo_id.to_string(), order);
        color
    }

    pub fn repo_color(&self, repo_id: &str) -> Option<Rgb> {
        self.repo_index.get(repo_id).map(|&i| self.repos[i].1)
    }

    pub fn repo_colors(&self) -> &[(String, Rgb)] {
        &self.repos
    }

    pub fn repo_count(&self) -> usize {
        self.repos.len()
    }

    pub fn file_color(&self, path: &str, category: FileCategory) -> Rgb {
        extension(path)
            .and_then(|ext| self.extension_overrides.get(&ext).copied())
            .unwrap_or_else(|| category_color(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(repo: &str, ts: i64) -> CommitEvent {
        CommitEvent {
            repo_id: repo.to_string(),
            sha: format!("{repo}-{ts}"),
            timestamp_ms: ts,
            affected_files: Vec::new(),
        }
    }

    #[test]
    fn repos_get_palette_colors_in_first_seen_order() {
        let mut table = ColorTable::default();
        table.assign_repos(&[event("b", 1), event("a", 2), event("b", 3)]);
        assert_eq!(table.repo_count(), 2);
        assert_eq!(table.repo_color("b"), Some(REPO_PALETTE[0]));
        assert_eq!(table.repo_color("a"), Some(REPO_PALETTE[1]));
        assert_eq!(table.repo_color("missing"), None);
        assert_eq!(table.repo_colors()[0].0, "b");
    }

    #[test]
    fn palette_wraps_round_robin() {
        let events: Vec<_> = (0..14).map(|i| event(&format!("r{i}"), i)).collect();
        let mut table = ColorTable::default();
        table.assign_repos(&events);
        assert_eq!(table.repo_color("r12"), table.repo_color("r0"));
        assert_eq!(table.repo_color("r13"), table.repo_color("r1"));
    }

    #[test]
    fn categories_follow_extension_and_name() {
        assert_eq!(categorize("src/main.rs"), FileCategory::Code);
        assert_eq!(categorize("src/a.ts"), FileCategory::Web);
        assert_eq!(categorize("docs/readme.md"), FileCategory::Docs);
        assert_eq!(categorize("Cargo.toml"), FileCategory::Config);
        assert_eq!(categorize("Makefile"), FileCategory::Build);
        assert_eq!(categorize("src/a.test.ts"), FileCategory::Test);
        assert_eq!(categorize("tests/engine.rs"), FileCategory::Test);
        assert_eq!(categorize(".gitignore"), FileCategory::Other);
        assert_eq!(categorize("bin/run"), FileCategory::Other);
    }

    #[test]
    fn extension_override_wins_and_bad_hex_is_ignored() {
        let mut overrides = BTreeMap::new();
        overrides.insert(".RS".to_string(), "#010203".to_string());
        overrides.insert("md".to_string(), "nope".to_string());
        let table = ColorTable::new(&overrides);

        assert_eq!(
            table.file_color("src/lib.rs", FileCategory::Code),
            Rgb::new(1, 2, 3)
        );
        assert_eq!(
            table.file_color("readme.md", FileCategory::Docs),
            category_color(FileCategory::Docs)
        );
    }
}
