// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of test inputs and variant programs.
//!
//! Both kinds of discovery walk a flat directory, filter on a name pattern,
//! and sort lexicographically by file name. The sorted order is load-bearing:
//! case indices are derived from it, and oracle tie-breaks favor the variant
//! that appears first in it.

use crate::{
    config::LanguageSpec,
    errors::{CorpusError, PoolError},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix that identifies a source file as a variant.
pub const VARIANT_PREFIX: &str = "variant_";

/// Extension that identifies a file as a test input.
pub const TEST_INPUT_EXTENSION: &str = "in";

/// A single test input, read into memory at discovery time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestCase {
    /// Zero-based index of this case within the sorted corpus. Persisted bug
    /// cases are named after it.
    pub case_index: usize,

    /// The input's file name, e.g. `test_0003.in`.
    pub name: String,

    /// The input text fed to each program over stdin.
    pub input: String,
}

/// The full set of test inputs for a run, in sorted order.
#[derive(Clone, Debug)]
pub struct InputCorpus {
    dir: Utf8PathBuf,
    cases: Vec<TestCase>,
}

impl InputCorpus {
    /// Scans `dir` for `*.in` files, sorts them by file name, and reads each
    /// one into memory.
    ///
    /// Inputs are read eagerly so that a file disappearing mid-run can't skew
    /// the vote for later cases. Returns an error if the directory can't be
    /// read or contains no inputs.
    pub fn scan(dir: &Utf8Path) -> Result<Self, CorpusError> {
        let paths = scan_sorted(dir, |path| {
            path.extension() == Some(TEST_INPUT_EXTENSION)
        })
        .map_err(|error| CorpusError::ReadDir {
            dir: dir.to_owned(),
            error,
        })?;

        if paths.is_empty() {
            return Err(CorpusError::NoTestInputs { dir: dir.to_owned() });
        }

        let cases = paths
            .into_iter()
            .enumerate()
            .map(|(case_index, path)| {
                let input = fs::read_to_string(&path).map_err(|error| CorpusError::ReadInput {
                    path: path.clone(),
                    error,
                })?;
                Ok(TestCase {
                    case_index,
                    name: file_name_of(&path),
                    input,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dir: dir.to_owned(),
            cases,
        })
    }

    /// Returns the directory this corpus was scanned from.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the number of test cases.
    pub fn test_count(&self) -> usize {
        self.cases.len()
    }

    /// Iterates over the test cases in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &TestCase> + '_ {
        self.cases.iter()
    }
}

/// A single variant program in the pool.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variant {
    /// The variant's file name, e.g. `variant_0007.py`.
    pub name: String,

    /// Path to the variant's source file.
    pub path: Utf8PathBuf,
}

/// The pool of presumed-equivalent variants whose outputs are voted into an
/// oracle.
#[derive(Clone, Debug)]
pub struct VariantPool {
    dir: Utf8PathBuf,
    variants: Vec<Variant>,
}

impl VariantPool {
    /// Scans `dir` for `variant_*.<ext>` sources matching `language`, sorted
    /// by file name.
    ///
    /// Returns an error if the directory can't be read or no variants match.
    pub fn scan(dir: &Utf8Path, language: &LanguageSpec) -> Result<Self, PoolError> {
        let paths = scan_sorted(dir, |path| {
            path.extension() == Some(language.extension())
                && path
                    .file_name()
                    .is_some_and(|name| name.starts_with(VARIANT_PREFIX))
        })
        .map_err(|error| PoolError::ReadDir {
            dir: dir.to_owned(),
            error,
        })?;

        if paths.is_empty() {
            return Err(PoolError::NoVariants {
                dir: dir.to_owned(),
                extension: language.extension().to_owned(),
            });
        }

        let variants = paths
            .into_iter()
            .map(|path| Variant {
                name: file_name_of(&path),
                path,
            })
            .collect();

        Ok(Self {
            dir: dir.to_owned(),
            variants,
        })
    }

    /// Returns the directory this pool was scanned from.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the number of variants in the pool.
    ///
    /// This is the denominator for vote counts, whether or not every variant
    /// produces output on a given case.
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Iterates over the variants in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Variant> + '_ {
        self.variants.iter()
    }
}

/// Collects entries of `dir` that pass `filter`, sorted by path.
///
/// Sorting `Utf8PathBuf`s within a single directory is equivalent to sorting
/// by file name.
fn scan_sorted(
    dir: &Utf8Path,
    filter: impl Fn(&Utf8Path) -> bool,
) -> Result<Vec<Utf8PathBuf>, std::io::Error> {
    let mut paths = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_file() && filter(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort_unstable();
    Ok(paths)
}

fn file_name_of(path: &Utf8Path) -> String {
    path.file_name()
        .unwrap_or(path.as_str())
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use std::fs;

    fn write_file(dir: &Utf8Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).expect("write fixture file");
    }

    #[test]
    fn corpus_scan_sorts_and_indexes() {
        let temp = Utf8TempDir::new().expect("created temp dir");
        write_file(temp.path(), "b.in", "2\n");
        write_file(temp.path(), "a.in", "1\n");
        write_file(temp.path(), "c.in", "3\n");
        write_file(temp.path(), "notes.txt", "ignored");

        let corpus = InputCorpus::scan(temp.path()).expect("scan succeeds");
        assert_eq!(corpus.test_count(), 3);

        let cases: Vec<_> = corpus.iter().collect();
        assert_eq!(cases[0].name, "a.in");
        assert_eq!(cases[0].case_index, 0);
        assert_eq!(cases[0].input, "1\n");
        assert_eq!(cases[1].name, "b.in");
        assert_eq!(cases[1].case_index, 1);
        assert_eq!(cases[2].name, "c.in");
        assert_eq!(cases[2].case_index, 2);
    }

    #[test]
    fn corpus_scan_rejects_empty_dir() {
        let temp = Utf8TempDir::new().expect("created temp dir");
        write_file(temp.path(), "readme.md", "no inputs here");

        let err = InputCorpus::scan(temp.path()).expect_err("no inputs");
        assert!(matches!(err, CorpusError::NoTestInputs { .. }));
    }

    #[test]
    fn pool_scan_filters_on_prefix_and_extension() {
        let temp = Utf8TempDir::new().expect("created temp dir");
        write_file(temp.path(), "variant_002.py", "print(2)");
        write_file(temp.path(), "variant_001.py", "print(1)");
        write_file(temp.path(), "variant_003.cpp", "// wrong language");
        write_file(temp.path(), "helper.py", "# not a variant");

        let pool =
            VariantPool::scan(temp.path(), &LanguageSpec::python()).expect("scan succeeds");
        assert_eq!(pool.variant_count(), 2);

        let names: Vec<_> = pool.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["variant_001.py", "variant_002.py"]);
    }

    #[test]
    fn pool_scan_rejects_empty_dir() {
        let temp = Utf8TempDir::new().expect("created temp dir");
        write_file(temp.path(), "variant_001.py", "print(1)");

        let err = VariantPool::scan(temp.path(), &LanguageSpec::cpp()).expect_err("no variants");
        assert!(matches!(
            err,
            PoolError::NoVariants { extension, .. } if extension == "cpp"
        ));
    }
}
