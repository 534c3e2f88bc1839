//! Property-based tests for path resolution and copy invariants.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::editor::{CopyOptions, Editor};
    use crate::path::{
        get_common_path, globify, has_magic, normalize, relative_to, to_slash, Globified,
    };
    use crate::store::{MemStore, StagedTree};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Root for generated paths; never present on a test machine
    const ROOT: &str = "/stagecopy-proptest-root";

    fn segments() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z][a-z0-9_-]{0,7}", 1..5)
    }

    // ============================================================================
    // get_common_path property tests
    // ============================================================================

    proptest! {
        /// Property: a recursive glob's common path is the directory before `/**`
        #[test]
        fn common_path_strips_recursive_suffix(segs in segments()) {
            let dir = format!("{}/{}", ROOT, segs.join("/"));
            let pattern = format!("{}/**", dir);
            prop_assert_eq!(get_common_path([pattern]), PathBuf::from(dir));
        }

        /// Property: the common path is an ancestor of every pattern's literal prefix
        #[test]
        fn common_path_is_shared_prefix(a in segments(), b in segments()) {
            let first = format!("{}/{}/*.txt", ROOT, a.join("/"));
            let second = format!("{}/{}/*.txt", ROOT, b.join("/"));
            let common = get_common_path([first, second]);

            let a_dir = format!("{}/{}", ROOT, a.join("/"));
            let b_dir = format!("{}/{}", ROOT, b.join("/"));
            prop_assert!(Path::new(&a_dir).starts_with(&common));
            prop_assert!(Path::new(&b_dir).starts_with(&common));
            prop_assert!(common.starts_with(ROOT));
        }

        /// Property: exclusions never change the common path
        #[test]
        fn common_path_ignores_negations(segs in segments(), excluded in segments()) {
            let pattern = format!("{}/{}/**", ROOT, segs.join("/"));
            let negation = format!("!/{}/**", excluded.join("/"));
            prop_assert_eq!(
                get_common_path([pattern.clone()]),
                get_common_path([pattern, negation])
            );
        }
    }

    // ============================================================================
    // globify property tests
    // ============================================================================

    proptest! {
        /// Property: patterns pass through globify unchanged
        #[test]
        fn globify_keeps_patterns(segs in segments(), ext in "[a-z]{1,4}") {
            let pattern = format!("{}/{}/*.{}", ROOT, segs.join("/"), ext);
            prop_assert!(has_magic(&pattern));
            prop_assert_eq!(globify(&pattern).unwrap(), Globified::Pattern(pattern.clone()));
        }

        /// Property: a missing path yields itself and its recursive form, every time
        #[test]
        fn globify_missing_path_is_deterministic(segs in segments()) {
            let path = format!("{}/{}", ROOT, segs.join("/"));
            let first = globify(&path).unwrap();
            let second = globify(&path).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(
                first.into_patterns(),
                vec![path.clone(), format!("{}/**", path)]
            );
        }
    }

    // ============================================================================
    // normalize / relative_to property tests
    // ============================================================================

    proptest! {
        /// Property: normalizing twice changes nothing
        #[test]
        fn normalize_is_idempotent(segs in prop::collection::vec("[a-z]{1,4}|\\.|\\.\\.", 1..8)) {
            let path = PathBuf::from(format!("/{}", segs.join("/")));
            let once = normalize(&path);
            prop_assert_eq!(normalize(&once), once);
        }

        /// Property: joining the root-relative path back onto the root restores the path
        #[test]
        fn relative_to_round_trips(root in segments(), rest in segments()) {
            let root = PathBuf::from(format!("{}/{}", ROOT, root.join("/")));
            let path = root.join(rest.join("/"));
            let relative = relative_to(&path, &root);
            prop_assert!(relative.is_relative());
            prop_assert_eq!(normalize(&root.join(relative)), path);
        }
    }

    // ============================================================================
    // Duplicate matches: last write wins, idempotently
    // ============================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Property: files matched both on disk and in the staged tree are copied
        /// once per match, and the outcome is the same as copying them once
        #[test]
        fn duplicate_matches_are_idempotent(
            files in prop::collection::btree_map("[a-z]{1,6}", ("[a-z ]{0,12}", any::<bool>()), 1..6)
        ) {
            let temp = TempDir::new().unwrap();
            let src = temp.path().join("src");
            fs::create_dir_all(&src).unwrap();

            let mut store = MemStore::new();
            let mut expected = BTreeMap::new();
            for (name, (contents, staged_too)) in &files {
                let path = src.join(format!("{}.txt", name));
                fs::write(&path, "on disk").unwrap();
                if *staged_too {
                    store.set(&path, contents.clone().into_bytes(), None).unwrap();
                    expected.insert(name.clone(), contents.clone());
                } else {
                    expected.insert(name.clone(), "on disk".to_string());
                }
            }

            let pattern = format!("{}/*.txt", to_slash(&src));
            let out = temp.path().join("out");

            let mut twice = Editor::with_store(store.clone());
            twice.copy(pattern.clone(), &out, &CopyOptions::default()).unwrap();
            twice.copy(pattern, &out, &CopyOptions::default()).unwrap();

            for (name, contents) in &expected {
                let copied = twice.read(out.join(format!("{}.txt", name))).unwrap();
                prop_assert_eq!(&copied, contents);
            }

            let mut outputs = 0;
            twice.store().each(&mut |file| {
                if file.path.starts_with(&out) {
                    outputs += 1;
                }
            });
            prop_assert_eq!(outputs, files.len());
        }
    }
}
