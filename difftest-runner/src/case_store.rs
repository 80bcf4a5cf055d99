// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisting bug-triggering cases to disk.
//!
//! Each confirmed defect is saved as three sibling files sharing a stem
//! derived from the case index: `case_NNNN.in` (the input), `case_NNNN.oracle`
//! (the voted output) and `case_NNNN.put` (what the program under test
//! printed). Re-running over the same corpus writes the same names, so stale
//! results never mix with fresh ones.

use crate::{errors::CaseStoreError, list::TestCase};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, io::Write};

/// Formats the shared file stem for a case index, e.g. `case_0012`.
///
/// Indices are zero-padded to four digits; wider indices keep all their
/// digits.
pub fn case_prefix(case_index: usize) -> String {
    format!("case_{case_index:04}")
}

/// The on-disk paths a defect was persisted to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SavedCase {
    /// The shared file stem, e.g. `case_0012`.
    pub prefix: String,

    /// Path of the persisted input.
    pub input_path: Utf8PathBuf,

    /// Path of the persisted oracle text.
    pub oracle_path: Utf8PathBuf,

    /// Path of the persisted output of the program under test.
    pub put_path: Utf8PathBuf,
}

/// A directory that bug-triggering cases are saved into.
#[derive(Clone, Debug)]
pub struct CaseStore {
    out_dir: Utf8PathBuf,
}

impl CaseStore {
    /// Creates a store rooted at `out_dir`, creating the directory if needed.
    pub fn new(out_dir: &Utf8Path) -> Result<Self, CaseStoreError> {
        fs::create_dir_all(out_dir).map_err(|error| CaseStoreError::CreateDir {
            dir: out_dir.to_owned(),
            error,
        })?;
        Ok(Self {
            out_dir: out_dir.to_owned(),
        })
    }

    /// Returns the directory cases are saved into.
    pub fn out_dir(&self) -> &Utf8Path {
        &self.out_dir
    }

    /// Saves one defect: the case input, the oracle text and the output of
    /// the program under test.
    ///
    /// Existing files for the same case index are overwritten. Each file is
    /// written atomically so a crash mid-save can't leave a truncated case
    /// behind.
    pub fn save(
        &self,
        case: &TestCase,
        oracle_text: &str,
        put_output: &str,
    ) -> Result<SavedCase, CaseStoreError> {
        let prefix = case_prefix(case.case_index);
        let input_path = self.out_dir.join(format!("{prefix}.in"));
        let oracle_path = self.out_dir.join(format!("{prefix}.oracle"));
        let put_path = self.out_dir.join(format!("{prefix}.put"));

        write_atomic(&input_path, &case.input)?;
        write_atomic(&oracle_path, oracle_text)?;
        write_atomic(&put_path, put_output)?;

        Ok(SavedCase {
            prefix,
            input_path,
            oracle_path,
            put_path,
        })
    }
}

fn write_atomic(path: &Utf8Path, contents: &str) -> Result<(), CaseStoreError> {
    atomicwrites::AtomicFile::new(path, atomicwrites::AllowOverwrite)
        .write(|file| file.write_all(contents.as_bytes()))
        .map_err(|error| {
            let error = match error {
                atomicwrites::Error::Internal(error) | atomicwrites::Error::User(error) => error,
            };
            CaseStoreError::Write {
                path: path.to_owned(),
                error,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;

    fn case(case_index: usize, input: &str) -> TestCase {
        TestCase {
            case_index,
            name: format!("test_{case_index:04}.in"),
            input: input.to_owned(),
        }
    }

    #[test]
    fn prefix_is_zero_padded() {
        assert_eq!(case_prefix(0), "case_0000");
        assert_eq!(case_prefix(7), "case_0007");
        assert_eq!(case_prefix(12345), "case_12345");
    }

    #[test]
    fn save_writes_three_files() {
        let temp = Utf8TempDir::new().expect("created temp dir");
        let store = CaseStore::new(temp.path()).expect("store created");

        let saved = store
            .save(&case(3, "5 1\n1 2 3 4 5\n"), "4", "3")
            .expect("case saved");

        assert_eq!(saved.prefix, "case_0003");
        assert_eq!(
            fs::read_to_string(&saved.input_path).expect("input readable"),
            "5 1\n1 2 3 4 5\n"
        );
        assert_eq!(
            fs::read_to_string(&saved.oracle_path).expect("oracle readable"),
            "4"
        );
        assert_eq!(
            fs::read_to_string(&saved.put_path).expect("put readable"),
            "3"
        );
    }

    #[test]
    fn save_overwrites_previous_run() {
        let temp = Utf8TempDir::new().expect("created temp dir");
        let store = CaseStore::new(temp.path()).expect("store created");

        store
            .save(&case(0, "old input"), "old oracle", "old put")
            .expect("first save");
        let saved = store
            .save(&case(0, "new input"), "new oracle", "new put")
            .expect("second save");

        assert_eq!(
            fs::read_to_string(&saved.input_path).expect("input readable"),
            "new input"
        );
        assert_eq!(
            fs::read_to_string(&saved.oracle_path).expect("oracle readable"),
            "new oracle"
        );
    }

    #[test]
    fn new_creates_nested_directories() {
        let temp = Utf8TempDir::new().expect("created temp dir");
        let nested = temp.path().join("findings/run-1");

        let store = CaseStore::new(&nested).expect("store created");
        store.save(&case(1, "x"), "y", "z").expect("case saved");

        assert!(nested.join("case_0001.in").exists());
    }
}
