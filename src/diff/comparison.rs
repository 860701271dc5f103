use super::matcher::{Identified, align};
use super::model::{AnnotatedRow, ContentDiff, DiffMetadata, DiffStatus, FieldDiff, FieldDiffs};
use serde::Serialize;
use serde_json::Value;

/// Compares two text fields after trimming. A missing field equals `""`.
pub fn compare_string_fields(previous: Option<&str>, current: Option<&str>) -> Option<FieldDiff> {
    let before = previous.map(str::trim).unwrap_or_default();
    let after = current.map(str::trim).unwrap_or_default();
    (before != after).then(|| FieldDiff::modified(previous.map(Value::from)))
}

/// Compares two flags. A missing flag equals `false`, so toggling between
/// unset and explicit `false` is not a change. The recorded previous value is
/// the raw one, absent when the flag was unset.
pub fn compare_bool_fields(previous: Option<bool>, current: Option<bool>) -> Option<FieldDiff> {
    (previous.unwrap_or(false) != current.unwrap_or(false))
        .then(|| FieldDiff::modified(previous.map(Value::Bool)))
}

/// Deep structural equality over arbitrary JSON.
pub fn compare_values(previous: &Value, current: &Value) -> Option<FieldDiff> {
    (previous != current).then(|| FieldDiff::modified(Some(previous.clone())))
}

/// A list field reconciled row by row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedList {
    pub rows: Vec<AnnotatedRow>,
    /// A row was added, removed or modified.
    pub has_changes: bool,
    /// A paired row changed its position and nothing else.
    pub has_moves: bool,
}

/// Aligns two lists with the identity matcher and compares every paired row
/// with `compare_row`. Rows are annotated in aligned order; removed rows keep
/// their previous value.
pub fn compare_and_unify_lists<T, F>(previous: &[T], current: &[T], compare_row: F) -> UnifiedList
where
    T: Identified + Serialize,
    F: Fn(&T, &T) -> FieldDiffs,
{
    let alignment = align(previous, current);
    let mut unified = UnifiedList::default();

    for pair in &alignment.pairs {
        let (value, diff) = match (pair.previous, pair.current) {
            (Some(i), Some(j)) => (
                to_value(&current[j]),
                DiffMetadata::paired(compare_row(&previous[i], &current[j]), pair.moved),
            ),
            (None, Some(j)) => (to_value(&current[j]), Some(DiffMetadata::added())),
            (Some(i), None) => (to_value(&previous[i]), Some(DiffMetadata::removed())),
            (None, None) => continue,
        };
        match diff.as_ref().map(|d| d.status) {
            Some(DiffStatus::Moved) => unified.has_moves = true,
            Some(_) => unified.has_changes = true,
            None => {}
        }
        unified.rows.push(AnnotatedRow { value, diff });
    }

    unified
}

/// Accumulates the field and list changes of one content comparison,
/// skipping unchanged fields.
#[derive(Debug, Default)]
pub(crate) struct ContentChanges {
    diff: ContentDiff,
}

impl ContentChanges {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, path: &str, diff: Option<FieldDiff>) -> &mut Self {
        if let Some(diff) = diff {
            self.diff.fields.insert(path.to_string(), diff);
        }
        self
    }

    pub(crate) fn string(
        &mut self,
        path: &str,
        previous: Option<&str>,
        current: Option<&str>,
    ) -> &mut Self {
        self.record(path, compare_string_fields(previous, current))
    }

    pub(crate) fn boolean(
        &mut self,
        path: &str,
        previous: Option<bool>,
        current: Option<bool>,
    ) -> &mut Self {
        self.record(path, compare_bool_fields(previous, current))
    }

    pub(crate) fn value<S: Serialize>(&mut self, path: &str, previous: &S, current: &S) -> &mut Self {
        self.record(path, compare_values(&to_value(previous), &to_value(current)))
    }

    /// Reconciles a list field. The field is marked modified when a row was
    /// added, removed or changed. Rows are kept whenever any row carries an
    /// annotation, so pure reorders surface only as row moves.
    pub(crate) fn list<T, F>(&mut self, path: &str, previous: &[T], current: &[T], compare_row: F) -> &mut Self
    where
        T: Identified + Serialize,
        F: Fn(&T, &T) -> FieldDiffs,
    {
        let unified = compare_and_unify_lists(previous, current, compare_row);
        if unified.has_changes {
            self.diff
                .fields
                .insert(path.to_string(), FieldDiff::modified(None));
        }
        if unified.has_changes || unified.has_moves {
            self.diff.lists.insert(path.to_string(), unified.rows);
        }
        self
    }

    pub(crate) fn into_fields(self) -> FieldDiffs {
        self.diff.fields
    }

    pub(crate) fn into_content_diff(self) -> ContentDiff {
        self.diff
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
