use chrono::NaiveDateTime;
use indexmap::IndexMap;
use thiserror::Error;

use crate::dates::{add_months, BadDate, DateFormatHelpers};
use crate::value::{Binding, Value};

const DATE_ROOTS: [&str; 3] = ["yyyymmddhh", "yyyymmdd", "yyyymm"];

#[derive(Debug, Error)]
pub enum ExplodeError {
    #[error(transparent)]
    BadDate(#[from] BadDate),
    #[error("unrecognized date root '{0}'")]
    UnknownDateRoot(String),
}

/// Carries the process-wide frozen "now" and the loader-supplied
/// metadata defaults (`filename`, `folder`, `project`, `dataset`, ...)
/// that get merged into every exploded binding without overwriting a
/// value the descriptor already set.
pub struct ExplodeContext {
    pub effective_date: NaiveDateTime,
    pub defaults: Binding,
}

fn date_root_for_key(key: &str) -> Option<&'static str> {
    DATE_ROOTS
        .iter()
        .copied()
        .find(|root| key == *root || key.ends_with(&format!("_{root}")))
}

fn as_int_offset(v: &Value) -> Option<i64> {
    match v {
        Value::Int(n) => Some(*n),
        Value::Str(s) => s.parse::<i64>().ok(),
        _ => None,
    }
}

/// `handleDateField`: resolves an integer offset (or an array of them)
/// against `effective`, returning the inclusive range of formatted date
/// strings spanning `[min_offset, max_offset]`, sorted ascending.
pub fn handle_date_field(
    effective: NaiveDateTime,
    offsets: &[i64],
    root: &str,
) -> Result<Vec<String>, ExplodeError> {
    let lo = *offsets.iter().min().expect("non-empty offsets");
    let hi = *offsets.iter().max().expect("non-empty offsets");
    let mut out = Vec::with_capacity((hi - lo + 1).max(1) as usize);
    for o in lo..=hi {
        let dt = apply_offset(effective, o, root)?;
        out.push(format_root(dt, root));
    }
    out.sort();
    Ok(out)
}

fn apply_offset(d: NaiveDateTime, o: i64, root: &str) -> Result<NaiveDateTime, ExplodeError> {
    match root {
        "yyyymmddhh" => Ok(d + chrono::Duration::hours(o)),
        "yyyymmdd" => Ok(d + chrono::Duration::days(o)),
        "yyyymm" => Ok(NaiveDateTime::new(add_months(d.date(), o), d.time())),
        other => Err(ExplodeError::UnknownDateRoot(other.to_string())),
    }
}

fn format_root(d: NaiveDateTime, root: &str) -> String {
    match root {
        "yyyymmddhh" => d.format("%Y%m%d%H").to_string(),
        "yyyymmdd" => d.format("%Y%m%d").to_string(),
        "yyyymm" => d.format("%Y%m").to_string(),
        "yyyy" => d.format("%Y").to_string(),
        _ => unreachable!("checked by apply_offset"),
    }
}

fn cross_scalar(acc: Vec<Binding>, key: &str, value: Value) -> Vec<Binding> {
    acc.into_iter()
        .map(|mut b| {
            b.insert(key.to_string(), value.clone());
            b
        })
        .collect()
}

fn cross_array(acc: Vec<Binding>, key: &str, items: &[Value]) -> Vec<Binding> {
    let mut out = Vec::with_capacity(acc.len() * items.len().max(1));
    for base in &acc {
        for item in items {
            let mut b = base.clone();
            b.insert(key.to_string(), item.clone());
            out.push(b);
        }
    }
    out
}

fn cross_objects(
    acc: Vec<Binding>,
    subs: &[Binding],
    ctx: &ExplodeContext,
) -> Result<Vec<Binding>, ExplodeError> {
    let mut flattened = Vec::new();
    for sub in subs {
        flattened.extend(explode_raw(sub, ctx)?);
    }
    let mut out = Vec::with_capacity(acc.len() * flattened.len().max(1));
    for base in &acc {
        for item in &flattened {
            let mut b = base.clone();
            for (k, v) in item {
                b.insert(k.clone(), v.clone());
            }
            out.push(b);
        }
    }
    Ok(out)
}

fn explode_one(
    acc: Vec<Binding>,
    key: &str,
    value: &Value,
    ctx: &ExplodeContext,
) -> Result<Vec<Binding>, ExplodeError> {
    if let Some(root) = date_root_for_key(key) {
        // Only a bare int (or an array, incl. int-strings) is an offset. A
        // literal string like "20230914" is the date itself, bound as-is
        // so the date-field generator can derive its siblings from it.
        let offsets: Option<Vec<i64>> = match value {
            Value::Int(_) => as_int_offset(value).map(|n| vec![n]),
            Value::Array(items) => items.iter().map(as_int_offset).collect(),
            _ => None,
        };
        if let Some(offsets) = offsets {
            let dates = handle_date_field(ctx.effective_date, &offsets, root)?;
            let values: Vec<Value> = dates.into_iter().map(Value::Str).collect();
            return Ok(cross_array(acc, key, &values));
        }
    }

    match value {
        Value::Array(items) => Ok(cross_array(acc, key, items)),
        Value::Objects(subs) => cross_objects(acc, subs, ctx),
        scalar => Ok(cross_scalar(acc, key, scalar.clone())),
    }
}

/// Cartesian-expands `raw` without injecting metadata defaults or
/// running the date-field generator. Used internally so that
/// array-of-sub-objects fields are fully resolved before being merged
/// into their parent — see [`cross_objects`].
fn explode_raw(raw: &Binding, ctx: &ExplodeContext) -> Result<Vec<Binding>, ExplodeError> {
    let mut acc: Vec<Binding> = vec![IndexMap::new()];
    for (key, value) in raw {
        acc = explode_one(acc, key, value, ctx)?;
    }
    Ok(acc)
}

/// `explodeTemplate`: produces the Cartesian product of `raw`'s
/// array-valued slots, resolves integer date offsets, merges in the
/// loader-supplied metadata defaults, and runs the date-field generator
/// over each result. Callers still need [`crate::eval::eval_tmpl_recurse`]
/// to substitute the remaining `{name}` placeholders.
pub fn explode_template(raw: &Binding, ctx: &ExplodeContext) -> Result<Vec<Binding>, ExplodeError> {
    let mut acc = explode_raw(raw, ctx)?;

    for b in &mut acc {
        for (k, v) in &ctx.defaults {
            b.entry(k.clone()).or_insert_with(|| v.clone());
        }
        if !b.contains_key("table") {
            if let Some(Value::Str(filename)) = b.get("filename") {
                b.insert("table".to_string(), Value::Str(filename.clone()));
            }
        }
    }

    let mut helpers = DateFormatHelpers::new();
    for b in &mut acc {
        helpers.format_all_date_keys(b)?;
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval_tmpl_recurse;
    use chrono::NaiveDate;

    fn ctx() -> ExplodeContext {
        ExplodeContext {
            effective_date: NaiveDate::from_ymd_opt(2005, 12, 31)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            defaults: IndexMap::new(),
        }
    }

    fn binding(pairs: Vec<(&str, Value)>) -> Binding {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn s3_single_array_explosion() {
        let raw = binding(vec![
            ("table", Value::Str("{filename}_{keywords_table}".into())),
            (
                "keywords_table",
                Value::Array(vec![
                    Value::Str("url_kw".into()),
                    Value::Str("url_kw_title".into()),
                ]),
            ),
            ("overlap_threshold", Value::Str("0.2".into())),
        ]);
        let out = explode_template(&raw, &ctx()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["keywords_table"], Value::Str("url_kw".into()));
        assert_eq!(out[1]["keywords_table"], Value::Str("url_kw_title".into()));
    }

    #[test]
    fn objects_as_values_merge_in_acc_major_order() {
        let raw = binding(vec![
            (
                "a",
                Value::Array(vec![Value::Str("b".into()), Value::Str("c".into())]),
            ),
            (
                "d",
                Value::Objects(vec![
                    binding(vec![("e", Value::Str("f".into())), ("h", Value::Str("i".into()))]),
                    binding(vec![("e", Value::Str("g".into())), ("h", Value::Str("j".into()))]),
                ]),
            ),
        ]);
        let out = explode_template(&raw, &ctx()).unwrap();
        let pairs: Vec<(String, String)> = out
            .iter()
            .map(|b| {
                (
                    b["a"].as_str().unwrap().to_string(),
                    b["e"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("b".into(), "f".into()),
                ("b".into(), "g".into()),
                ("c".into(), "f".into()),
                ("c".into(), "g".into()),
            ]
        );
    }

    #[test]
    fn handle_date_field_day_offset() {
        let d = NaiveDate::from_ymd_opt(2005, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let result = handle_date_field(d, &[-1], "yyyymmdd").unwrap();
        assert_eq!(result, vec!["20051230".to_string()]);
    }

    #[test]
    fn handle_date_field_hour_range() {
        let d = NaiveDate::from_ymd_opt(2005, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let result = handle_date_field(d, &[-1, -3], "yyyymmddhh").unwrap();
        assert_eq!(
            result,
            vec![
                "2005123021".to_string(),
                "2005123022".to_string(),
                "2005123023".to_string(),
            ]
        );
    }

    #[test]
    fn empty_table_is_not_overwritten_by_filename_default() {
        let mut raw = binding(vec![
            ("filename", Value::Str("fname".into())),
            ("table", Value::Str("".into())),
            ("keywords_table", Value::Str("url_kw_{yyyymmdd}".into())),
            ("overlap_threshold", Value::Str("0.2".into())),
        ]);
        raw.insert("yyyymmdd".to_string(), Value::Str("20230914".into()));
        let out = explode_template(&raw, &ctx()).unwrap();
        let resolved = eval_tmpl_recurse(&out[0]).unwrap();
        assert_eq!(resolved["table"], Value::Str("".into()));
    }

    #[test]
    fn s4_literal_date_string_is_kept_not_treated_as_an_offset() {
        let raw = binding(vec![("yyyymmdd", Value::Str("20221231".into()))]);
        let out = explode_template(&raw, &ctx()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["yyyymmdd"], Value::Str("20221231".into()));
        assert_eq!(out[0]["yyyymmdd_yyyy"], Value::Str("2022".into()));
        assert_eq!(out[0]["yyyymmdd_mm"], Value::Str("12".into()));
        assert_eq!(out[0]["yyyymmdd_dd"], Value::Str("31".into()));
    }

    #[test]
    fn integer_offset_feeds_placeholder_resolution() {
        let raw = binding(vec![
            ("filename", Value::Str("myfile".into())),
            (
                "table",
                Value::Str("{filename}_{yyyymmdd}".into()),
            ),
            ("yyyymmdd", Value::Int(-1)),
        ]);
        let out = explode_template(&raw, &ctx()).unwrap();
        assert_eq!(out.len(), 1);
        let resolved = eval_tmpl_recurse(&out[0]).unwrap();
        assert_eq!(resolved["table"], Value::Str("myfile_20051230".into()));
    }

    proptest::proptest! {
        // Testable property #4: |explode(B)| == product of each
        // array-valued slot's length, with scalar-valued slots counting
        // as 1 — over an arbitrary number of arbitrary-length scalar
        // arrays mixed with plain scalar fields.
        #[test]
        fn explosion_cardinality_is_the_product_of_array_lengths(
            array_lens in proptest::collection::vec(1..4usize, 0..4),
            scalar_count in 0..3usize,
        ) {
            let mut raw: Binding = IndexMap::new();
            let mut expected: usize = 1;
            for (i, len) in array_lens.iter().enumerate() {
                let items: Vec<Value> = (0..*len).map(|j| Value::Str(format!("v{i}_{j}"))).collect();
                raw.insert(format!("arr_{i}"), Value::Array(items));
                expected *= len;
            }
            for i in 0..scalar_count {
                raw.insert(format!("scalar_{i}"), Value::Str(format!("s{i}")));
            }
            let out = explode_template(&raw, &ctx()).unwrap();
            proptest::prop_assert_eq!(out.len(), expected);
            for b in &out {
                for v in b.values() {
                    proptest::prop_assert!(v.is_scalar());
                }
            }
        }
    }
}
