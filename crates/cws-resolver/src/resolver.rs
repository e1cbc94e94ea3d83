use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use cws_core::ResolverConfig;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::manifest::{Manifest, RuleSet};

/// Manifest file expected one level below the source directory.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{role} directory does not exist: {}", path.display())]
    DirectoryNotFound { role: &'static str, path: PathBuf },
    #[error("there are no store configs at source directory {}", path.display())]
    NoManifests { path: PathBuf },
    #[error("failed to scan {}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse manifest {}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse ruleset {}", path.display())]
    RuleSet {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to copy {} to {}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why a manifest produced no provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    NoDesktopRuleSet,
    NoProvider,
    UndeclaredProvider(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "rulesets and providers are empty"),
            Self::NoDesktopRuleSet => write!(f, "there is no desktop ruleset"),
            Self::NoProvider => write!(f, "there is no provider for desktop"),
            Self::UndeclaredProvider(name) => {
                write!(f, "provider '{name}' is exposed but it's not defined")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Copied {
        provider: String,
        from: PathBuf,
        to: PathBuf,
    },
    Skipped(SkipReason),
}

/// Summary of one resolver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub manifests: usize,
    /// Destination files written, in manifest order.
    pub copied: Vec<PathBuf>,
    pub skipped: usize,
}

/// Resolves every manifest under the source directory and copies the
/// selected provider scripts into the destination directory.
#[instrument(skip_all, fields(src = %cfg.source_dir.display(), dest = %cfg.dest_dir.display()))]
pub fn resolve(cfg: &ResolverConfig) -> Result<ResolveReport, ResolveError> {
    ensure_dir("source", &cfg.source_dir)?;
    ensure_dir("destination", &cfg.dest_dir)?;

    let manifests = find_manifests(&cfg.source_dir)?;
    if manifests.is_empty() {
        return Err(ResolveError::NoManifests {
            path: cfg.source_dir.clone(),
        });
    }

    let mut report = ResolveReport::default();
    for manifest in &manifests {
        report.manifests += 1;
        match resolve_one(manifest, &cfg.dest_dir)? {
            Resolution::Copied { to, .. } => {
                if report.copied.contains(&to) {
                    warn!("{} was overwritten by {}", to.display(), manifest.display());
                } else {
                    report.copied.push(to);
                }
            }
            Resolution::Skipped(_) => report.skipped += 1,
        }
    }

    debug!("completed to copy store providers");
    Ok(report)
}

/// Lists `{source_dir}/*/manifest.json`, sorted by path.
pub fn find_manifests(source_dir: &Path) -> Result<Vec<PathBuf>, ResolveError> {
    let mut manifests = Vec::new();
    let walker = WalkDir::new(source_dir)
        .min_depth(2)
        .max_depth(2)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // Below the root, only an unreadable manifest is fatal; stale links and
            // other unreadable entries are not variants.
            Err(err)
                if err.depth() > 0
                    && err.path().and_then(Path::file_name) != Some(OsStr::new(MANIFEST_FILE)) =>
            {
                debug!("ignoring unreadable entry: {err}");
                continue;
            }
            Err(source) => {
                return Err(ResolveError::Walk {
                    path: source_dir.to_path_buf(),
                    source,
                })
            }
        };

        if entry.file_name() == MANIFEST_FILE && entry.file_type().is_file() {
            manifests.push(entry.into_path());
        }
    }

    Ok(manifests)
}

/// Resolves a single manifest.
///
/// Read and parse failures of the manifest or of the rule set it selects
/// are errors; every missing link in the chain is a [`Resolution::Skipped`].
#[instrument(skip(dest_dir), fields(manifest = %manifest_path.display()))]
pub fn resolve_one(manifest_path: &Path, dest_dir: &Path) -> Result<Resolution, ResolveError> {
    debug!("get file, try to get provider information");
    let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let manifest = Manifest::from_json(&read(manifest_path)?).map_err(|source| {
        ResolveError::Manifest {
            path: manifest_path.to_path_buf(),
            source,
        }
    })?;

    if manifest.is_empty() {
        return Ok(skip(SkipReason::Empty));
    }

    let Some(rule_set_file) = manifest.desktop_rule_set() else {
        return Ok(skip(SkipReason::NoDesktopRuleSet));
    };

    let rule_set_path = dir.join(rule_set_file);
    let rule_set = RuleSet::from_yaml(&read(&rule_set_path)?).map_err(|source| {
        ResolveError::RuleSet {
            path: rule_set_path.clone(),
            source,
        }
    })?;

    if rule_set.provider_name.is_empty() {
        return Ok(skip(SkipReason::NoProvider));
    }

    let Some(provider_file) = manifest.provider(&rule_set.provider_name) else {
        return Ok(skip(SkipReason::UndeclaredProvider(rule_set.provider_name)));
    };

    let from = dir.join(provider_file);
    let to = dest_dir.join(format!("{}.js", rule_set.provider_name));
    let bytes = copy_file_contents(&from, &to).map_err(|source| ResolveError::Copy {
        from: from.clone(),
        to: to.clone(),
        source,
    })?;

    info!(
        provider = %rule_set.provider_name,
        bytes,
        "copied {} to {}",
        from.display(),
        to.display()
    );
    Ok(Resolution::Copied {
        provider: rule_set.provider_name,
        from,
        to,
    })
}

fn ensure_dir(role: &'static str, path: &Path) -> Result<(), ResolveError> {
    if path.is_dir() {
        return Ok(());
    }
    Err(ResolveError::DirectoryNotFound {
        role,
        path: path.to_path_buf(),
    })
}

fn read(path: &Path) -> Result<String, ResolveError> {
    fs::read_to_string(path).map_err(|source| ResolveError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn skip(reason: SkipReason) -> Resolution {
    debug!("{reason}, skip it");
    Resolution::Skipped(reason)
}

/// Replaces `to` with the bytes of `from`, creating it if needed.
fn copy_file_contents(from: &Path, to: &Path) -> io::Result<u64> {
    let mut input = File::open(from)?;
    let mut output = File::create(to)?;
    let copied = io::copy(&mut input, &mut output)?;
    output.sync_all()?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        src: PathBuf,
        dest: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let src = tmp.path().join("src");
            let dest = tmp.path().join("dest");
            fs::create_dir_all(&src).unwrap();
            fs::create_dir_all(&dest).unwrap();
            Self {
                _tmp: tmp,
                src,
                dest,
            }
        }

        fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
            let path = self.src.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn config(&self) -> ResolverConfig {
            ResolverConfig::new(self.src.clone(), self.dest.clone()).unwrap()
        }

        fn dest_files(&self) -> Vec<String> {
            let mut names: Vec<_> = fs::read_dir(&self.dest)
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    const PROVIDER_JS: &[u8] = b"export default function provider() {}\n\x00\xff";

    fn resolvable(fx: &Fixture, variant: &str) -> PathBuf {
        fx.write(&format!("{variant}/p1.js"), PROVIDER_JS);
        fx.write(&format!("{variant}/rules.yml"), b"loadExternalProvider: p1\n");
        fx.write(
            &format!("{variant}/manifest.json"),
            br#"{"providers": {"p1": "p1.js"}, "ruleSets": {"desktop-rules": "rules.yml"}}"#,
        )
    }

    #[test]
    fn copies_resolved_provider_verbatim() {
        let fx = Fixture::new();
        resolvable(&fx, "acme");

        let report = resolve(&fx.config()).expect("resolve should pass");
        assert_eq!(report.manifests, 1);
        assert_eq!(report.copied, vec![fx.dest.join("p1.js")]);
        assert_eq!(fs::read(fx.dest.join("p1.js")).unwrap(), PROVIDER_JS);
    }

    #[test]
    fn skips_empty_manifest() {
        let fx = Fixture::new();
        let manifest = fx.write("empty/manifest.json", br#"{"name": "empty"}"#);

        let out = resolve_one(&manifest, &fx.dest).unwrap();
        assert_eq!(out, Resolution::Skipped(SkipReason::Empty));
        assert!(fx.dest_files().is_empty());
    }

    #[test]
    fn skips_manifest_without_desktop_ruleset() {
        let fx = Fixture::new();
        fx.write("m/p1.js", PROVIDER_JS);
        // The referenced file doesn't exist; it must never be read.
        let manifest = fx.write(
            "m/manifest.json",
            br#"{"providers": {"p1": "p1.js"}, "rulesets": {"mobile": "missing.yml"}}"#,
        );

        let out = resolve_one(&manifest, &fx.dest).unwrap();
        assert_eq!(out, Resolution::Skipped(SkipReason::NoDesktopRuleSet));
        assert!(fx.dest_files().is_empty());
    }

    #[test]
    fn skips_ruleset_without_provider() {
        let fx = Fixture::new();
        fx.write("m/rules.yml", b"loadExternalProvider: \"\"\n");
        let manifest = fx.write(
            "m/manifest.json",
            br#"{"providers": {"p1": "p1.js"}, "rulesets": {"desktop": "rules.yml"}}"#,
        );

        let out = resolve_one(&manifest, &fx.dest).unwrap();
        assert_eq!(out, Resolution::Skipped(SkipReason::NoProvider));
        assert!(fx.dest_files().is_empty());
    }

    #[test]
    fn skips_undeclared_provider() {
        let fx = Fixture::new();
        fx.write("m/rules.yml", b"loadExternalProvider: p2\n");
        let manifest = fx.write(
            "m/manifest.json",
            br#"{"providers": {"p1": "p1.js"}, "rulesets": {"desktop": "rules.yml"}}"#,
        );

        let out = resolve_one(&manifest, &fx.dest).unwrap();
        assert_eq!(
            out,
            Resolution::Skipped(SkipReason::UndeclaredProvider("p2".to_string()))
        );
        assert!(fx.dest_files().is_empty());
    }

    #[test]
    fn skipped_manifests_do_not_fail_the_run() {
        let fx = Fixture::new();
        fx.write("a-empty/manifest.json", b"{}");
        resolvable(&fx, "b-real");

        let report = resolve(&fx.config()).expect("resolve should pass");
        assert_eq!(report.manifests, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(fx.dest_files(), vec!["p1.js"]);
    }

    #[test]
    fn no_manifests_is_fatal() {
        let fx = Fixture::new();
        fx.write("manifest.json", b"{}");
        fx.write("a/b/manifest.json", b"{}");

        let err = resolve(&fx.config()).expect_err("must fail");
        assert!(matches!(err, ResolveError::NoManifests { .. }));
    }

    #[test]
    fn missing_directories_are_reported_by_role() {
        let fx = Fixture::new();
        let absent = fx.src.join("absent");

        let err = resolve(&ResolverConfig::new(absent.clone(), fx.dest.clone()).unwrap())
            .expect_err("must fail");
        assert!(matches!(err, ResolveError::DirectoryNotFound { role: "source", .. }));

        let err = resolve(&ResolverConfig::new(fx.src.clone(), absent).unwrap())
            .expect_err("must fail");
        assert!(matches!(err, ResolveError::DirectoryNotFound { role: "destination", .. }));

        // A regular file is not a directory either.
        let file = fx.write("file.txt", b"x");
        let err = resolve(&ResolverConfig::new(file, fx.dest.clone()).unwrap())
            .expect_err("must fail");
        assert!(matches!(err, ResolveError::DirectoryNotFound { role: "source", .. }));
    }

    #[test]
    fn unreadable_referenced_ruleset_aborts_the_run() {
        let fx = Fixture::new();
        fx.write(
            "m/manifest.json",
            br#"{"providers": {"p1": "p1.js"}, "rulesets": {"desktop": "gone.yml"}}"#,
        );

        let err = resolve(&fx.config()).expect_err("must fail");
        assert!(matches!(err, ResolveError::Read { ref path, .. } if path.ends_with("gone.yml")));
    }

    #[test]
    fn malformed_manifest_aborts_the_run() {
        let fx = Fixture::new();
        fx.write("m/manifest.json", b"{ not json");

        let err = resolve(&fx.config()).expect_err("must fail");
        assert!(matches!(err, ResolveError::Manifest { .. }));
    }

    #[test]
    fn missing_provider_script_is_a_copy_error() {
        let fx = Fixture::new();
        fx.write("m/rules.yml", b"loadExternalProvider: p1\n");
        fx.write(
            "m/manifest.json",
            br#"{"providers": {"p1": "absent.js"}, "rulesets": {"desktop": "rules.yml"}}"#,
        );

        let err = resolve(&fx.config()).expect_err("must fail");
        assert!(matches!(err, ResolveError::Copy { .. }));
    }

    #[test]
    fn repeated_runs_leave_identical_output() {
        let fx = Fixture::new();
        resolvable(&fx, "acme");
        fs::write(fx.dest.join("p1.js"), b"stale content that is much longer than the provider").unwrap();

        let first = resolve(&fx.config()).unwrap();
        let after_first = fs::read(fx.dest.join("p1.js")).unwrap();
        let second = resolve(&fx.config()).unwrap();
        let after_second = fs::read(fx.dest.join("p1.js")).unwrap();

        assert_eq!(first, second);
        assert_eq!(after_first, PROVIDER_JS);
        assert_eq!(after_first, after_second);
        assert_eq!(fx.dest_files(), vec!["p1.js"]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_links_beside_variants_are_ignored() {
        let fx = Fixture::new();
        resolvable(&fx, "acme");
        let nowhere = fx.src.parent().unwrap().join("nowhere");
        std::os::unix::fs::symlink(&nowhere, fx.src.join("zz-stale-link")).unwrap();
        std::os::unix::fs::symlink(&nowhere, fx.src.join("acme").join("stale.js")).unwrap();

        let report = resolve(&fx.config()).expect("stale links must not fail the run");
        assert_eq!(report.manifests, 1);
        assert_eq!(fx.dest_files(), vec!["p1.js"]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_manifest_link_is_fatal() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.src.join("broken")).unwrap();
        std::os::unix::fs::symlink(
            fx.src.parent().unwrap().join("nowhere.json"),
            fx.src.join("broken").join(MANIFEST_FILE),
        )
        .unwrap();

        let err = resolve(&fx.config()).expect_err("must fail");
        assert!(matches!(err, ResolveError::Walk { .. }));
    }

    #[test]
    fn manifests_are_found_in_sorted_order() {
        let fx = Fixture::new();
        fx.write("zeta/manifest.json", b"{}");
        fx.write("alpha/manifest.json", b"{}");
        fx.write("alpha/other.json", b"{}");
        fs::create_dir_all(fx.src.join("empty-dir")).unwrap();

        let found = find_manifests(&fx.src).unwrap();
        assert_eq!(
            found,
            vec![
                fx.src.join("alpha").join(MANIFEST_FILE),
                fx.src.join("zeta").join(MANIFEST_FILE),
            ]
        );
    }
}
