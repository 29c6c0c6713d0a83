use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use resource_model::{Resource, ResourceKind};
use template_model::{Binding, ExplodeContext, Value};

use crate::build::{build_local_data_resource, build_one_per_binding, build_union, dataset_resource, kind_for_suffix};
use crate::descriptor::parse_descriptor;
use crate::error::CatalogError;

/// The merged CLI-level state every loaded file sees: `--var` bindings
/// (highest precedence, override even a descriptor's own keys),
/// `--varsFile` contents, and the `--defaultProject`/`--defaultDataset`
/// fallbacks, plus the frozen effective date for relative offsets.
pub struct LoaderContext {
    pub effective_date: NaiveDateTime,
    pub cli_vars: Binding,
    pub vars_file: Binding,
    pub default_project: String,
    pub default_dataset: Option<String>,
}

impl LoaderContext {
    /// The global bindings as seen with no per-file descriptor in play —
    /// what `--print-global-args` reports.
    pub fn merged_globals(&self) -> Binding {
        self.merge_into(&IndexMap::new())
    }

    fn merge_into(&self, file_binding: &Binding) -> Binding {
        let mut merged: Binding = IndexMap::new();
        if let Some(dataset) = &self.default_dataset {
            merged.insert("dataset".to_string(), Value::Str(dataset.clone()));
        }
        merged.insert("project".to_string(), Value::Str(self.default_project.clone()));
        for (k, v) in &self.vars_file {
            merged.insert(k.clone(), v.clone());
        }
        for (k, v) in file_binding {
            merged.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.cli_vars {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

/// Scans `folder` non-recursively for recognized descriptor files, loads
/// each, and returns every resource they produce plus the dataset
/// resources those addresses imply. Duplicate keys across files are
/// tolerated only when the two loads are byte-identical; otherwise this
/// is the fatal `DuplicateKeyDivergent`.
pub fn load_folder(folder: &Path, ctx: &LoaderContext) -> Result<Vec<Resource>, CatalogError> {
    let mut by_key: IndexMap<String, Resource> = IndexMap::new();
    let mut datasets_seen: HashMap<(String, String), ()> = HashMap::new();

    let mut entries: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(|e| CatalogError::Io(folder.display().to_string(), e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    for path in entries {
        let Some(suffix) = recognized_suffix(&path) else { continue };
        let source = path.display().to_string();

        let explode_ctx = ExplodeContext {
            effective_date: ctx.effective_date,
            defaults: loader_defaults(&path),
        };

        // `.localdata`'s own content *is* the payload, not a descriptor to
        // parse — its dataset/table/project come entirely from the loader
        // context (`--var`, `--defaultDataset`, ...) and the filename.
        if suffix == ".localdata" {
            let raw_data = fs::read_to_string(&path).map_err(|e| CatalogError::Io(source.clone(), e))?;
            let schema_path = path.with_extension("schema");
            let schema_text = fs::read_to_string(&schema_path)
                .map_err(|_| CatalogError::MissingSchema(source.clone()))?;
            let metadata = ctx.merge_into(&IndexMap::new());
            let resource = build_local_data_resource(&metadata, &explode_ctx, &raw_data, &schema_text, &source)?;
            register(&mut by_key, &mut datasets_seen, resource)?;
            continue;
        }

        let kind = kind_for_suffix(&suffix).expect("recognized_suffix only returns known suffixes");
        let text = fs::read_to_string(&path).map_err(|e| CatalogError::Io(source.clone(), e))?;
        let file_bindings = parse_descriptor(&text, &path)?;

        for file_binding in &file_bindings {
            let merged = ctx.merge_into(file_binding);
            let built = if matches!(kind, ResourceKind::UnionView | ResourceKind::UnionTable) {
                vec![build_union(&merged, &explode_ctx, kind, &source)?]
            } else {
                build_one_per_binding(&merged, &explode_ctx, kind, &source)?
            };

            for resource in built {
                register(&mut by_key, &mut datasets_seen, resource)?;
            }
        }
    }

    Ok(by_key.into_values().collect())
}

/// Registers one built resource, auto-injecting its dataset resource the
/// first time that `(project, dataset)` pair is seen.
fn register(
    by_key: &mut IndexMap<String, Resource>,
    datasets_seen: &mut HashMap<(String, String), ()>,
    resource: Resource,
) -> Result<(), CatalogError> {
    let key = (resource.address.project.clone(), resource.address.dataset.clone());
    if datasets_seen.insert(key, ()).is_none() {
        insert_or_check(by_key, dataset_resource(&resource.address.project, &resource.address.dataset))?;
    }
    insert_or_check(by_key, resource)
}

fn insert_or_check(by_key: &mut IndexMap<String, Resource>, resource: Resource) -> Result<(), CatalogError> {
    match by_key.get(&resource.key()) {
        Some(existing) if !existing.is_identical_definition(&resource) => {
            Err(CatalogError::DuplicateKeyDivergent(resource.key()))
        }
        Some(_) => Ok(()),
        None => {
            by_key.insert(resource.key(), resource);
            Ok(())
        }
    }
}

fn recognized_suffix(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    crate::build::RECOGNIZED_SUFFIXES
        .iter()
        .find(|suffix| name.ends_with(*suffix))
        .map(|s| s.to_string())
}

fn loader_defaults(path: &Path) -> Binding {
    let mut defaults: Binding = IndexMap::new();
    if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
        defaults.insert("filename".to_string(), Value::Str(name.to_string()));
    }
    if let Some(folder) = path.parent().and_then(|p| p.file_name()).and_then(|s| s.to_str()) {
        defaults.insert("folder".to_string(), Value::Str(folder.to_string()));
    }
    defaults
}
