//! Test-code exclusion over raw facts.
//!
//! Runs before any atlas component so that test helpers never show up as
//! goroutines, implementations or graph entities.

use tracing::debug;

use super::facts::{GoPackage, GoRawData};

/// Whether a module-relative package path is test-only by location.
///
/// Matches a top-level `tests` directory (`tests`, `tests/e2e`) and packages
/// whose last segment ends in `testutil` (`pkg/testutil`, `internal/dbtestutil`).
pub fn is_test_package_path(full_name: &str) -> bool {
    let mut segments = full_name.split('/');
    let first = segments.next().unwrap_or("");
    let last = full_name.rsplit('/').next().unwrap_or("");
    first == "tests" || last.ends_with("testutil") || full_name.ends_with("_test")
}

fn is_test_file(path: &str) -> bool {
    path.ends_with("_test.go")
}

/// Strip `_test.go` files and the declarations located in them. Returns
/// `None` when the package only had test files.
fn strip_test_files(mut package: GoPackage) -> Option<GoPackage> {
    if !package.source_files.is_empty() {
        package.source_files.retain(|f| !is_test_file(f));
        if package.source_files.is_empty() {
            return None;
        }
    }
    package.structs.retain(|s| !is_test_file(&s.location.file));
    package.interfaces.retain(|i| !is_test_file(&i.location.file));
    package.functions.retain(|f| !is_test_file(&f.location.file));
    for st in &mut package.structs {
        st.methods.retain(|m| !is_test_file(&m.location.file));
    }
    Some(package)
}

/// Remove test files and test-only packages.
pub fn exclude_tests(raw: GoRawData) -> GoRawData {
    let GoRawData {
        packages,
        module_root,
        module_name,
    } = raw;

    let packages = packages
        .into_iter()
        .filter(|p| {
            let keep = !is_test_package_path(&p.full_name);
            if !keep {
                debug!(package = %p.full_name, "excluding test package");
            }
            keep
        })
        .filter_map(strip_test_files)
        .collect();

    GoRawData {
        packages,
        module_root,
        module_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::facts::{GoFunction, SourceLocation};

    fn package(full_name: &str, files: &[&str]) -> GoPackage {
        let mut p = GoPackage::new(full_name.rsplit('/').next().unwrap(), full_name);
        p.source_files = files.iter().map(|f| format!("{}/{}", full_name, f)).collect();
        p
    }

    #[test]
    fn test_only_service_survives() {
        let raw = GoRawData {
            packages: vec![
                package("pkg/service", &["service.go"]),
                package("tests/integration", &["flow.go"]),
                package("tests/e2e", &["e2e.go"]),
                package("pkg/testutil", &["helpers.go"]),
            ],
            module_root: "/src".to_string(),
            module_name: "example.com/app".to_string(),
        };

        let filtered = exclude_tests(raw);
        let names: Vec<_> = filtered.packages.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["pkg/service"]);
    }

    #[test]
    fn test_strips_test_declarations() {
        let mut p = package("pkg/store", &["store.go", "store_test.go"]);
        for (name, file) in [("Open", "pkg/store/store.go"), ("TestOpen", "pkg/store/store_test.go")] {
            p.functions.push(GoFunction {
                name: name.to_string(),
                package_name: "store".to_string(),
                parameters: vec![],
                return_types: vec![],
                exported: true,
                location: SourceLocation::at_line(file, 1),
                body: None,
            });
        }
        let only_tests = package("pkg/fixtures", &["fixtures_test.go"]);

        let filtered = exclude_tests(GoRawData {
            packages: vec![p, only_tests],
            ..Default::default()
        });
        assert_eq!(filtered.packages.len(), 1);
        let store = &filtered.packages[0];
        assert_eq!(store.source_files, vec!["pkg/store/store.go"]);
        assert_eq!(store.functions.len(), 1);
        assert_eq!(store.functions[0].name, "Open");
    }

    #[test]
    fn test_strips_declarations_without_file_list() {
        let mut p = GoPackage::new("store", "pkg/store");
        for (name, file) in [("Open", "pkg/store/store.go"), ("TestOpen", "pkg/store/store_test.go")] {
            p.functions.push(GoFunction {
                name: name.to_string(),
                package_name: "store".to_string(),
                parameters: vec![],
                return_types: vec![],
                exported: true,
                location: SourceLocation::at_line(file, 3),
                body: None,
            });
        }

        let filtered = exclude_tests(GoRawData {
            packages: vec![p],
            ..Default::default()
        });
        assert_eq!(filtered.packages.len(), 1);
        let names: Vec<_> = filtered.packages[0].functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Open"]);
    }

    #[test]
    fn test_path_rules() {
        assert!(is_test_package_path("tests"));
        assert!(is_test_package_path("internal/dbtestutil"));
        assert!(is_test_package_path("pkg/a_test"));
        assert!(!is_test_package_path("pkg/tests"));
        assert!(!is_test_package_path("cmd/stress"));
    }
}
