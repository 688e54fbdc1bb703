//! Encoding string values as categoricals, and manipulating label sets.
use hashbrown::HashMap;
use relframe_error::{RelError, Result};

use super::array::Array;
use super::datatype::{CategoricalTypeMeta, DataType};

/// How the label set of a new categorical is determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSet {
    /// Use exactly these labels in this order.
    Explicit(Vec<String>),
    /// Distinct values in byte order.
    SortedDistinct,
    /// Distinct values in the order they first appear.
    FirstAppearance,
}

impl LabelSet {
    pub fn explicit<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        LabelSet::Explicit(labels.into_iter().map(|s| s.into()).collect())
    }
}

/// Encode string values as a categorical array.
///
/// With an explicit label set, a value outside the set is a type mismatch
/// unless `allow_new` is set, in which case unseen values are appended to the
/// label set in first-appearance order. Missing values stay missing.
pub fn encode_categorical<'a>(
    values: impl IntoIterator<Item = Option<&'a str>>,
    labels: &LabelSet,
    allow_new: bool,
) -> Result<Array> {
    let values: Vec<Option<&str>> = values.into_iter().collect();

    let mut label_list: Vec<String> = match labels {
        LabelSet::Explicit(labels) => labels.clone(),
        LabelSet::SortedDistinct => {
            let mut distinct: Vec<&str> = values.iter().flatten().copied().collect();
            distinct.sort_unstable();
            distinct.dedup();
            distinct.into_iter().map(|s| s.to_string()).collect()
        }
        LabelSet::FirstAppearance => Vec::new(),
    };
    let grow = allow_new || matches!(labels, LabelSet::FirstAppearance);

    let mut lookup: HashMap<String, u32> = HashMap::with_capacity(label_list.len());
    for (idx, label) in label_list.iter().enumerate() {
        if lookup.insert(label.clone(), idx as u32).is_some() {
            return Err(
                RelError::invalid_argument("Duplicate categorical label").with_field("label", label)
            );
        }
    }

    let mut codes = Vec::with_capacity(values.len());
    for value in values {
        let Some(value) = value else {
            codes.push(None);
            continue;
        };
        let code = match lookup.get(value) {
            Some(code) => *code,
            None if grow => {
                let code = label_list.len() as u32;
                label_list.push(value.to_string());
                lookup.insert(value.to_string(), code);
                code
            }
            None => {
                return Err(RelError::type_mismatch(
                    "Value is not a label of the categorical",
                )
                .with_field("value", value));
            }
        };
        codes.push(Some(code));
    }

    Array::try_from_codes(CategoricalTypeMeta::try_new(label_list)?, codes)
}

/// Encode a string or categorical array against a fixed label set.
pub fn encode_with_meta(arr: &Array, meta: &CategoricalTypeMeta) -> Result<Array> {
    encode_categorical(
        arr.iter_str()?,
        &LabelSet::Explicit(meta.labels().to_vec()),
        false,
    )
}

/// Rename labels of a categorical array.
///
/// Renaming a label to one that already exists merges the two, keeping the
/// position of the earlier label.
pub fn recode_labels(arr: &Array, renames: &[(&str, &str)]) -> Result<Array> {
    let meta = categorical_meta(arr)?;

    let mut renamed: Vec<String> = meta.labels().to_vec();
    for (old, new) in renames {
        let code = meta.code_of(old).ok_or_else(|| {
            RelError::invalid_argument("Cannot recode a label that doesn't exist")
                .with_field("label", old)
        })?;
        renamed[code as usize] = new.to_string();
    }

    // Collapse duplicates produced by the renames, first position wins.
    let mut new_labels: Vec<String> = Vec::with_capacity(renamed.len());
    let mut code_map: Vec<u32> = Vec::with_capacity(renamed.len());
    for label in renamed {
        match new_labels.iter().position(|l| *l == label) {
            Some(pos) => code_map.push(pos as u32),
            None => {
                code_map.push(new_labels.len() as u32);
                new_labels.push(label);
            }
        }
    }

    let codes: Vec<_> = arr
        .iter_codes()?
        .map(|code| code.map(|c| code_map[c as usize]))
        .collect();
    Array::try_from_codes(CategoricalTypeMeta::try_new(new_labels)?, codes)
}

/// Move the given labels to the front of the label set, in the given order.
/// Remaining labels keep their relative order.
///
/// Values are unchanged, only their ordering position changes.
pub fn relevel(arr: &Array, first: &[&str]) -> Result<Array> {
    let meta = categorical_meta(arr)?;

    let mut order: Vec<u32> = Vec::with_capacity(meta.num_labels());
    for label in first {
        let code = meta.code_of(label).ok_or_else(|| {
            RelError::invalid_argument("Cannot relevel a label that doesn't exist")
                .with_field("label", label)
        })?;
        if !order.contains(&code) {
            order.push(code);
        }
    }
    for code in 0..meta.num_labels() as u32 {
        if !order.contains(&code) {
            order.push(code);
        }
    }

    // order[new] = old, invert to map old codes to new codes.
    let mut code_map = vec![0_u32; order.len()];
    for (new_code, old_code) in order.iter().enumerate() {
        code_map[*old_code as usize] = new_code as u32;
    }
    let new_labels: Vec<String> = order
        .iter()
        .map(|code| meta.labels()[*code as usize].clone())
        .collect();

    let codes: Vec<_> = arr
        .iter_codes()?
        .map(|code| code.map(|c| code_map[c as usize]))
        .collect();
    Array::try_from_codes(CategoricalTypeMeta::try_new(new_labels)?, codes)
}

fn categorical_meta(arr: &Array) -> Result<&CategoricalTypeMeta> {
    match arr.datatype() {
        DataType::Categorical(meta) => Ok(meta),
        other => Err(RelError::type_mismatch(format!(
            "Expected categorical array, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use relframe_error::ErrorKind;

    use super::*;

    fn labels_of(arr: &Array) -> Vec<String> {
        categorical_meta(arr).unwrap().labels().to_vec()
    }

    fn values_of(arr: &Array) -> Vec<Option<String>> {
        arr.iter_str()
            .unwrap()
            .map(|v| v.map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn explicit_labels() {
        let months = LabelSet::explicit(["Jan", "Feb", "Mar", "Apr"]);
        let arr = encode_categorical([Some("Mar"), None, Some("Jan")], &months, false).unwrap();

        assert_eq!(vec!["Jan", "Feb", "Mar", "Apr"], labels_of(&arr));
        assert_eq!(
            vec![Some(2), None, Some(0)],
            arr.iter_codes().unwrap().collect::<Vec<_>>()
        );
    }

    #[test]
    fn explicit_labels_reject_unknown() {
        let months = LabelSet::explicit(["Jan", "Feb"]);
        let err = encode_categorical([Some("Jam")], &months, false).unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
    }

    #[test]
    fn explicit_labels_allow_new() {
        let months = LabelSet::explicit(["Jan", "Feb"]);
        let arr =
            encode_categorical([Some("Dec"), Some("Jan"), Some("Jam")], &months, true).unwrap();
        assert_eq!(vec!["Jan", "Feb", "Dec", "Jam"], labels_of(&arr));
    }

    #[test]
    fn sorted_and_first_appearance() {
        let vals = [Some("Dec"), Some("Apr"), Some("Dec"), Some("Jan")];

        let sorted = encode_categorical(vals, &LabelSet::SortedDistinct, false).unwrap();
        assert_eq!(vec!["Apr", "Dec", "Jan"], labels_of(&sorted));

        let first = encode_categorical(vals, &LabelSet::FirstAppearance, false).unwrap();
        assert_eq!(vec!["Dec", "Apr", "Jan"], labels_of(&first));
    }

    #[test]
    fn recode_rename_and_merge() {
        let arr = encode_categorical(
            [Some("Strong republican"), Some("Not str republican"), None],
            &LabelSet::explicit(["Strong republican", "Not str republican", "Independent"]),
            false,
        )
        .unwrap();

        let out = recode_labels(
            &arr,
            &[
                ("Strong republican", "Republican"),
                ("Not str republican", "Republican"),
            ],
        )
        .unwrap();

        assert_eq!(vec!["Republican", "Independent"], labels_of(&out));
        assert_eq!(
            vec![Some("Republican".to_string()), Some("Republican".to_string()), None],
            values_of(&out)
        );
    }

    #[test]
    fn recode_unknown_label() {
        let arr =
            encode_categorical([Some("a")], &LabelSet::FirstAppearance, false).unwrap();
        recode_labels(&arr, &[("b", "c")]).unwrap_err();
    }

    #[test]
    fn relevel_moves_to_front() {
        let arr = encode_categorical(
            [Some("b"), Some("d"), Some("a")],
            &LabelSet::explicit(["a", "b", "c", "d"]),
            false,
        )
        .unwrap();

        let out = relevel(&arr, &["d", "c"]).unwrap();
        assert_eq!(vec!["d", "c", "a", "b"], labels_of(&out));
        assert_eq!(values_of(&arr), values_of(&out));
        assert_eq!(
            vec![Some(3), Some(0), Some(2)],
            out.iter_codes().unwrap().collect::<Vec<_>>()
        );
    }

    #[test]
    fn encode_from_utf8_array() {
        let meta = CategoricalTypeMeta::try_new(["x", "y"]).unwrap();
        let arr = Array::from_iter([Some("y"), None]);
        let out = encode_with_meta(&arr, &meta).unwrap();
        assert_eq!(DataType::Categorical(meta), *out.datatype());
    }
}
