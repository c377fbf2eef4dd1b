//! Imputation and encoding shared by training and inference.
//!
//! Everything here is fitted once on the training table and then applied
//! unchanged to incoming records; the fitted `Preprocessor` is persisted in
//! the model bundle so inference never refits on a single row.
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};

use crate::data_handling::LabeledData;
use crate::error::{ClassifierError, Result};
use crate::io::table::{is_missing, parse_cell, ColumnKind, RawTable};
use crate::math::Array2;

/// Median of the non-NaN values, `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return None;
    }
    Some(Data::new(present).median())
}

/// Per-column median imputation. Columns whose entry is `None` are left
/// untouched (they are encoded categoricals).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedianImputer {
    pub medians: Vec<Option<f32>>,
}

impl MedianImputer {
    /// Fit medians for `columns` of `x`; NaN marks a missing value.
    pub fn fit(x: &Array2<f32>, names: &[String], columns: &[usize]) -> Result<Self> {
        let mut medians = vec![None; x.ncols()];
        for &c in columns {
            let values: Vec<f64> = x.column(c).into_iter().map(f64::from).collect();
            let m = median(&values).ok_or_else(|| {
                ClassifierError::EmptyColumn(names.get(c).cloned().unwrap_or_default())
            })?;
            medians[c] = Some(m as f32);
        }
        Ok(MedianImputer { medians })
    }

    pub fn transform_row(&self, row: &mut [f32]) {
        for (value, median) in row.iter_mut().zip(self.medians.iter()) {
            if let (true, Some(m)) = (value.is_nan(), median) {
                *value = *m;
            }
        }
    }

    pub fn transform(&self, x: &mut Array2<f32>) {
        for r in 0..x.nrows() {
            self.transform_row(x.row_slice_mut(r));
        }
    }
}

/// Ordinal encoding of a categorical feature (categories sorted). Missing
/// cells take the most frequent category.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoricalEncoder {
    pub categories: Vec<String>,
    pub fill: usize,
}

impl CategoricalEncoder {
    pub fn fit<'a>(name: &str, values: impl Iterator<Item = &'a str>) -> Result<Self> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for v in values.filter(|v| !is_missing(v)) {
            *counts.entry(v.trim().to_string()).or_insert(0) += 1;
        }
        if counts.is_empty() {
            return Err(ClassifierError::EmptyColumn(name.to_string()));
        }
        // BTreeMap iterates sorted, so ties go to the first category.
        let mut fill = 0;
        let mut best = 0;
        for (i, &count) in counts.values().enumerate() {
            if count > best {
                best = count;
                fill = i;
            }
        }
        Ok(CategoricalEncoder {
            categories: counts.into_keys().collect(),
            fill,
        })
    }

    pub fn encode(&self, column: &str, value: Option<&str>) -> Result<f32> {
        match value.map(str::trim) {
            None => Ok(self.fill as f32),
            Some(v) if is_missing(v) => Ok(self.fill as f32),
            Some(v) => self
                .categories
                .binary_search_by(|c| c.as_str().cmp(v))
                .map(|i| i as f32)
                .map_err(|_| ClassifierError::UnknownCategory {
                    column: column.to_string(),
                    value: v.to_string(),
                }),
        }
    }
}

/// Maps category strings to dense integer labels in sorted order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = values.map(|v| v.trim().to_string()).collect();
        classes.sort();
        classes.dedup();
        LabelEncoder { classes }
    }

    pub fn transform(&self, value: &str) -> Option<i32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value.trim()))
            .ok()
            .map(|i| i as i32)
    }

    pub fn inverse_transform(&self, label: i32) -> Option<&str> {
        usize::try_from(label)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
    }
}

/// How the target column became integer labels.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TargetEncoding {
    Categorical { encoder: LabelEncoder },
    Numeric { classes: Vec<i32> },
}

impl TargetEncoding {
    /// Every encoded label seen in training, ascending.
    pub fn labels(&self) -> Vec<i32> {
        match self {
            TargetEncoding::Categorical { encoder } => (0..encoder.classes.len() as i32).collect(),
            TargetEncoding::Numeric { classes } => classes.clone(),
        }
    }

    /// Human readable class name for an encoded label.
    pub fn class_name(&self, label: i32) -> String {
        match self {
            TargetEncoding::Categorical { encoder } => encoder
                .inverse_transform(label)
                .map(str::to_string)
                .unwrap_or_else(|| label.to_string()),
            TargetEncoding::Numeric { .. } => label.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnEncoding {
    Numeric,
    Categorical(CategoricalEncoder),
}

/// A single field of an incoming record.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Missing,
    Number(f64),
    Text(String),
}

/// Fitted preprocessing state: feature order, encodings and imputation
/// medians.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Preprocessor {
    pub feature_names: Vec<String>,
    pub encodings: Vec<ColumnEncoding>,
    pub imputer: MedianImputer,
    pub target_column: String,
    pub target: TargetEncoding,
}

impl Preprocessor {
    /// Fit on a raw table and return the encoded, imputed training data.
    /// Every column except the target and the optional identifier becomes a
    /// feature, in file order.
    pub fn fit(
        table: &RawTable,
        target_column: &str,
        id_column: Option<&str>,
    ) -> Result<(Preprocessor, LabeledData)> {
        let target_idx = table.require_column(target_column)?;
        let id_idx = id_column.map(|c| table.require_column(c)).transpose()?;

        let feature_idx: Vec<usize> = (0..table.ncols())
            .filter(|&i| i != target_idx && Some(i) != id_idx)
            .collect();
        let feature_names: Vec<String> =
            feature_idx.iter().map(|&i| table.headers[i].clone()).collect();

        let mut encodings = Vec::with_capacity(feature_idx.len());
        let mut columns: Vec<Vec<f32>> = Vec::with_capacity(feature_idx.len());
        let mut numeric = Vec::new();

        for (c, &idx) in feature_idx.iter().enumerate() {
            let name = &table.headers[idx];
            match table.column_kind(idx) {
                ColumnKind::Numeric => {
                    let values = table.numeric_column(idx)?;
                    columns.push(
                        values
                            .into_iter()
                            .map(|v| v.map(|v| v as f32).unwrap_or(f32::NAN))
                            .collect(),
                    );
                    encodings.push(ColumnEncoding::Numeric);
                    numeric.push(c);
                }
                ColumnKind::Categorical => {
                    let encoder = CategoricalEncoder::fit(name, table.column(idx))?;
                    let encoded = table
                        .column(idx)
                        .map(|v| encoder.encode(name, Some(v)))
                        .collect::<Result<Vec<f32>>>()?;
                    log::debug!(
                        "Encoded categorical column '{}' with {} categories",
                        name,
                        encoder.categories.len()
                    );
                    columns.push(encoded);
                    encodings.push(ColumnEncoding::Categorical(encoder));
                }
            }
        }

        let nrows = table.nrows();
        let ncols = feature_idx.len();
        let mut data = Vec::with_capacity(nrows * ncols);
        for r in 0..nrows {
            for column in &columns {
                data.push(column[r]);
            }
        }
        let mut x = Array2::from_shape_vec((nrows, ncols), data)?;

        let imputer = MedianImputer::fit(&x, &feature_names, &numeric)?;
        imputer.transform(&mut x);

        let (target, y) = encode_target(table, target_idx)?;

        let preprocessor = Preprocessor {
            feature_names: feature_names.clone(),
            encodings,
            imputer,
            target_column: target_column.to_string(),
            target,
        };
        let data = LabeledData::new(x, y, feature_names)?;
        Ok((preprocessor, data))
    }

    /// Encode one record into a feature row in training column order.
    /// Fields outside the feature set are ignored; absent feature fields are
    /// reported together as a column mismatch.
    pub fn transform_record(&self, record: &HashMap<String, FieldValue>) -> Result<Vec<f32>> {
        let missing: Vec<String> = self
            .feature_names
            .iter()
            .filter(|name| !record.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ClassifierError::ColumnMismatch { missing });
        }

        let mut row = Vec::with_capacity(self.feature_names.len());
        for (name, encoding) in self.feature_names.iter().zip(self.encodings.iter()) {
            let value = &record[name];
            let encoded = match (encoding, value) {
                (ColumnEncoding::Numeric, FieldValue::Missing) => f32::NAN,
                (ColumnEncoding::Numeric, FieldValue::Number(v)) => *v as f32,
                (ColumnEncoding::Numeric, FieldValue::Text(s)) => parse_cell(s)
                    .map_err(|_| ClassifierError::InvalidValue {
                        column: name.clone(),
                        value: s.clone(),
                    })?
                    .map(|v| v as f32)
                    .unwrap_or(f32::NAN),
                (ColumnEncoding::Categorical(enc), FieldValue::Missing) => enc.encode(name, None)?,
                (ColumnEncoding::Categorical(enc), FieldValue::Text(s)) => {
                    enc.encode(name, Some(s))?
                }
                (ColumnEncoding::Categorical(enc), FieldValue::Number(v)) => {
                    enc.encode(name, Some(&format_number(*v)))?
                }
            };
            row.push(encoded);
        }
        self.imputer.transform_row(&mut row);
        Ok(row)
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn encode_target(table: &RawTable, idx: usize) -> Result<(TargetEncoding, Vec<i32>)> {
    let name = &table.headers[idx];
    match table.column_kind(idx) {
        ColumnKind::Categorical => {
            if let Some(v) = table.column(idx).find(|v| is_missing(v)) {
                return Err(ClassifierError::InvalidValue {
                    column: name.clone(),
                    value: v.to_string(),
                });
            }
            let encoder = LabelEncoder::fit(table.column(idx));
            let y = table
                .column(idx)
                .map(|v| {
                    encoder
                        .transform(v)
                        .ok_or_else(|| ClassifierError::InvalidValue {
                            column: name.clone(),
                            value: v.to_string(),
                        })
                })
                .collect::<Result<Vec<i32>>>()?;
            log::info!("Label-encoded target '{}': {:?}", name, encoder.classes);
            Ok((TargetEncoding::Categorical { encoder }, y))
        }
        ColumnKind::Numeric => {
            let values = table.numeric_column(idx)?;
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            if present.iter().any(|v| v.fract() != 0.0) {
                return encode_fractional_target(name, &values);
            }
            let fill = median(&present).ok_or_else(|| ClassifierError::EmptyColumn(name.clone()))?;
            let y = values
                .into_iter()
                .map(|v| v.unwrap_or_else(|| fill.round()) as i32)
                .collect::<Vec<i32>>();
            let mut classes = y.clone();
            classes.sort_unstable();
            classes.dedup();
            Ok((TargetEncoding::Numeric { classes }, y))
        }
    }
}

/// Non-integer stage values are kept distinct: each value becomes a class,
/// numbered in ascending numeric order.
fn encode_fractional_target(
    name: &str,
    values: &[Option<f64>],
) -> Result<(TargetEncoding, Vec<i32>)> {
    if values.iter().any(Option::is_none) {
        return Err(ClassifierError::InvalidValue {
            column: name.to_string(),
            value: "missing".to_string(),
        });
    }
    let mut distinct: Vec<f64> = values.iter().flatten().copied().collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    let y = values
        .iter()
        .flatten()
        .map(|v| distinct.partition_point(|d| d < v) as i32)
        .collect();
    let encoder = LabelEncoder {
        classes: distinct.into_iter().map(format_number).collect(),
    };
    log::info!("Label-encoded fractional target '{}': {:?}", name, encoder.classes);
    Ok((TargetEncoding::Categorical { encoder }, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_table_from_reader;

    fn table(data: &str) -> RawTable {
        read_table_from_reader(data.as_bytes(), b',').unwrap()
    }

    #[test]
    fn median_ignores_nan() {
        assert_eq!(median(&[1.0, f64::NAN, 3.0, 2.0]), Some(2.0));
        assert_eq!(median(&[f64::NAN]), None);
    }

    #[test]
    fn label_encoder_is_sorted_and_dense() {
        let enc = LabelEncoder::fit(["C", "A", "B", "A"].into_iter());
        assert_eq!(enc.classes, vec!["A", "B", "C"]);
        assert_eq!(enc.transform("C"), Some(2));
        assert_eq!(enc.inverse_transform(1), Some("B"));
        assert_eq!(enc.transform("D"), None);
    }

    #[test]
    fn categorical_encoder_fills_with_mode() {
        let enc = CategoricalEncoder::fit("sex", ["M", "F", "F", "NA"].into_iter()).unwrap();
        assert_eq!(enc.categories, vec!["F", "M"]);
        assert_eq!(enc.encode("sex", None).unwrap(), 0.0);
        assert_eq!(enc.encode("sex", Some("M")).unwrap(), 1.0);
        assert!(enc.encode("sex", Some("X")).is_err());
    }

    #[test]
    fn fit_drops_target_and_id() {
        let t = table("patient_id,a,stage\n1,1.0,A\n2,,B\n3,3.0,A\n");
        let (pre, data) = Preprocessor::fit(&t, "stage", Some("patient_id")).unwrap();
        assert_eq!(pre.feature_names, vec!["a"]);
        assert_eq!(data.y, vec![0, 1, 0]);
        assert_eq!(data.x.column(0), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn numeric_target_keeps_values() {
        let t = table("a,stage\n1,4\n2,\n3,2\n4,4\n");
        let (pre, data) = Preprocessor::fit(&t, "stage", None).unwrap();
        assert_eq!(data.y, vec![4, 4, 2, 4]);
        assert_eq!(pre.target.labels(), vec![2, 4]);
    }

    #[test]
    fn fractional_target_values_stay_distinct() {
        let t = table("a,stage\n1,1.2\n2,1.4\n3,2\n4,1.2\n5,1.4\n6,2\n");
        let (pre, data) = Preprocessor::fit(&t, "stage", None).unwrap();
        assert_eq!(data.y, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(pre.target.labels(), vec![0, 1, 2]);
        assert_eq!(pre.target.class_name(1), "1.4");
        assert_eq!(pre.target.class_name(2), "2");
    }

    #[test]
    fn fractional_target_rejects_missing() {
        let t = table("a,stage\n1,1.5\n2,\n3,2\n");
        let err = Preprocessor::fit(&t, "stage", None).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidValue { column, .. } if column == "stage"));
    }

    #[test]
    fn empty_numeric_column_fails() {
        let t = table("a,b,stage\n1,,A\n2,,B\n");
        let err = Preprocessor::fit(&t, "stage", None).unwrap_err();
        assert!(matches!(err, ClassifierError::EmptyColumn(c) if c == "b"));
    }

    #[test]
    fn record_uses_training_medians() {
        let t = table("a,b,stage\n1,10,A\n2,20,B\n3,30,A\n");
        let (pre, _) = Preprocessor::fit(&t, "stage", None).unwrap();
        let mut record = HashMap::new();
        record.insert("a".to_string(), FieldValue::Missing);
        record.insert("b".to_string(), FieldValue::Number(5.0));
        record.insert("extra".to_string(), FieldValue::Text("ignored".into()));
        assert_eq!(pre.transform_record(&record).unwrap(), vec![2.0, 5.0]);
    }

    #[test]
    fn record_missing_columns_are_listed() {
        let t = table("a,b,c,stage\n1,2,3,A\n");
        let (pre, _) = Preprocessor::fit(&t, "stage", None).unwrap();
        let mut record = HashMap::new();
        record.insert("a".to_string(), FieldValue::Number(1.0));
        let err = pre.transform_record(&record).unwrap_err();
        match err {
            ClassifierError::ColumnMismatch { missing } => assert_eq!(missing, vec!["b", "c"]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
