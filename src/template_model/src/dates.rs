use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::value::{Binding, Value};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("value '{value}' for key '{key}' does not parse as a date in root format '{root}'")]
pub struct BadDate {
    pub key: String,
    pub value: String,
    pub root: &'static str,
}

/// Snaps `d` to the first month of the quarter that starts `monthofquarter`
/// months in (1, 2 or 3), per `d - relativedelta(months=(d.month - monthofquarter) % 3)`.
pub fn quarter(d: NaiveDate, monthofquarter: u32) -> NaiveDate {
    debug_assert!((1..=3).contains(&monthofquarter));
    let delta = (d.month() as i64 - monthofquarter as i64).rem_euclid(3);
    sub_months(d, delta)
}

/// Adds `months` (possibly negative) to `d`, clamping the day-of-month
/// when the target month is shorter.
pub fn add_months(d: NaiveDate, months: i64) -> NaiveDate {
    sub_months(d, -months)
}

fn sub_months(d: NaiveDate, months: i64) -> NaiveDate {
    let total = d.year() as i64 * 12 + (d.month() as i64 - 1) - months;
    let year = total.div_euclid(12) as i32;
    let month = (total.rem_euclid(12) + 1) as u32;
    let last_day = days_in_month(year, month);
    NaiveDate::from_ymd_opt(year, month, d.day().min(last_day)).expect("valid clamped date")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .unwrap()
        .pred_opt()
        .unwrap()
        .day()
}

/// A single date root (`yyyymmddhh` / `yyyymmdd` / `yyyymm`) and the
/// derived suffix/format pairs it knows how to synthesize.
///
/// The `cache` field intentionally mirrors an upstream quirk: it is keyed
/// on the last `(key, value)` pair produced by the inner synthesis loop,
/// not on the `(k, v)` pair passed in, so cache lookups effectively never
/// hit. It is dead weight rather than a correctness issue — synthesis is
/// pure and idempotent either way — but it's preserved literally here
/// rather than "fixed" into a working cache.
pub struct DateFormatHelper {
    root_format: &'static str,
    formats: Vec<&'static str>,
    suffixes: Vec<&'static str>,
    cache: HashMap<String, IndexMap<String, (String, &'static str)>>,
}

impl DateFormatHelper {
    fn new(formats: Vec<&'static str>, suffixes: Vec<&'static str>) -> Self {
        assert!(!formats.is_empty());
        assert_eq!(formats.len(), suffixes.len());
        DateFormatHelper {
            root_format: formats[0],
            formats,
            suffixes,
            cache: HashMap::new(),
        }
    }

    fn root_suffix(&self) -> &'static str {
        self.suffixes[0]
    }

    fn show_new_keys(&self, keys: &[String]) -> IndexSet<String> {
        let mut out = IndexSet::new();
        let root = self.root_suffix();
        for k in keys {
            if k == root || k.ends_with(&format!("_{root}")) {
                for suffix in &self.suffixes[1..] {
                    out.insert(k.replace(root, suffix));
                }
            }
        }
        out
    }

    fn format_date_key(&mut self, key: &str, value: &str, m: &mut Binding) -> Result<(), BadDate> {
        let root = self.root_suffix();
        if key != root && !key.ends_with(&format!("_{root}")) {
            return Ok(());
        }

        let cache_key = format!("{key}:{value}");
        let toset = if let Some(cached) = self.cache.get(&cache_key) {
            cached.clone()
        } else {
            let parsed = parse_root(value, root, self.root_format).ok_or(BadDate {
                key: key.to_string(),
                value: value.to_string(),
                root,
            })?;
            let mut toset = IndexMap::new();
            for i in 1..self.suffixes.len() {
                let new_key = key.replace(root, self.suffixes[i]);
                let anchored = if self.suffixes[i].contains("_qm1") {
                    quarter(parsed, 1)
                } else if self.suffixes[i].contains("_qm2") {
                    quarter(parsed, 2)
                } else if self.suffixes[i].contains("_qm3") {
                    quarter(parsed, 3)
                } else {
                    parsed
                };
                let new_val = strftime(anchored, self.formats[i]);
                toset.insert(new_key, (new_val, self.suffixes[i]));
            }
            toset
        };

        let mut last: Option<(String, String)> = None;
        for (k, (v, suffix)) in &toset {
            let mut v = v.clone();
            if suffix.ends_with("_MMM") {
                v = v.to_uppercase();
            } else if suffix.ends_with("_mmm") {
                v = v.to_lowercase();
            }
            last = Some((k.clone(), v.clone()));
            if !m.contains_key(k) {
                m.insert(k.clone(), Value::Str(v));
            }
        }

        if let Some((last_key, last_val)) = last {
            self.cache
                .insert(format!("{last_key}:{last_val}"), toset);
        }
        Ok(())
    }
}

fn strftime(d: NaiveDate, format: &str) -> String {
    match format {
        "%Y" => format!("{:04}", d.year()),
        "%y" => format!("{:02}", d.year().rem_euclid(100)),
        "%m" => format!("{:02}", d.month()),
        "%d" => format!("{:02}", d.day()),
        "%b" => month_abbrev(d.month()).to_string(),
        other => d.format(other).to_string(),
    }
}

fn month_abbrev(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    NAMES[(month - 1) as usize]
}

fn parse_root(value: &str, root: &'static str, _format: &str) -> Option<NaiveDate> {
    match root {
        "yyyymmddhh" => {
            if value.len() != 10 {
                return None;
            }
            NaiveDate::parse_from_str(&value[..8], "%Y%m%d").ok()
        }
        "yyyymmdd" => NaiveDate::parse_from_str(value, "%Y%m%d").ok(),
        "yyyymm" => {
            if value.len() != 6 {
                return None;
            }
            NaiveDate::parse_from_str(&format!("{value}01"), "%Y%m%d").ok()
        }
        _ => None,
    }
}

/// All three recognized date roots, bundled the way the upstream module
/// bundles them as a single process-wide registry.
pub struct DateFormatHelpers {
    formatters: Vec<DateFormatHelper>,
}

impl Default for DateFormatHelpers {
    fn default() -> Self {
        Self::new()
    }
}

impl DateFormatHelpers {
    pub fn new() -> Self {
        let hh = DateFormatHelper::new(
            vec!["%Y%m%d%H", "%Y", "%m", "%d", "%H", "%b", "%b", "%b", "%y"],
            vec![
                "yyyymmddhh",
                "yyyymmddhh_yyyy",
                "yyyymmddhh_mm",
                "yyyymmddhh_dd",
                "yyyymmddhh_hh",
                "yyyymmddhh_mmm",
                "yyyymmddhh_MMM",
                "yyyymmddhh_Mmm",
                "yyyymmddhh_yy",
            ],
        );

        let dd = DateFormatHelper::new(
            vec![
                "%Y%m%d", "%Y", "%m", "%d", "%y", "%b", "%b", "%b", "%m", "%m", "%m", "%Y", "%Y",
                "%Y", "%d", "%d", "%d",
            ],
            vec![
                "yyyymmdd",
                "yyyymmdd_yyyy",
                "yyyymmdd_mm",
                "yyyymmdd_dd",
                "yyyymmdd_yy",
                "yyyymmdd_mmm",
                "yyyymmdd_MMM",
                "yyyymmdd_Mmm",
                "yyyymmdd_qm1_mm",
                "yyyymmdd_qm2_mm",
                "yyyymmdd_qm3_mm",
                "yyyymmdd_qm1_yyyy",
                "yyyymmdd_qm2_yyyy",
                "yyyymmdd_qm3_yyyy",
                "yyyymmdd_qm1_dd",
                "yyyymmdd_qm2_dd",
                "yyyymmdd_qm3_dd",
            ],
        );

        let mm = DateFormatHelper::new(
            vec![
                "%Y%m", "%Y", "%m", "%b", "%b", "%b", "%y", "%m", "%m", "%m", "%Y", "%Y", "%Y",
                "%y", "%y", "%y", "%b", "%b", "%b",
            ],
            vec![
                "yyyymm",
                "yyyymm_yyyy",
                "yyyymm_mm",
                "yyyymm_mmm",
                "yyyymm_MMM",
                "yyyymm_Mmm",
                "yyyymm_yy",
                "yyyymm_qm1_mm",
                "yyyymm_qm2_mm",
                "yyyymm_qm3_mm",
                "yyyymm_qm1_yyyy",
                "yyyymm_qm2_yyyy",
                "yyyymm_qm3_yyyy",
                "yyyymm_qm1_yy",
                "yyyymm_qm2_yy",
                "yyyymm_qm3_yy",
                "yyyymm_qm1_MMM",
                "yyyymm_qm2_MMM",
                "yyyymm_qm3_MMM",
            ],
        );

        DateFormatHelpers {
            formatters: vec![hh, dd, mm],
        }
    }

    pub fn show_new_keys(&self, keys: &[String]) -> IndexSet<String> {
        let mut out = IndexSet::new();
        for f in &self.formatters {
            out.extend(f.show_new_keys(keys));
        }
        out
    }

    /// Applies every registered date root to every current key/value pair
    /// in `m`, inserting derived siblings in place. Never overwrites an
    /// explicitly-bound key. Idempotent: re-running over an
    /// already-expanded binding adds nothing new, since the derived keys
    /// it would produce are already present.
    pub fn format_all_date_keys(&mut self, m: &mut Binding) -> Result<(), BadDate> {
        let snapshot: Vec<(String, String)> = m
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();
        for f in &mut self.formatters {
            for (k, v) in &snapshot {
                f.format_date_key(k, v, m)?;
            }
        }
        Ok(())
    }
}
