use indexmap::IndexMap;
use resource_model::{Resource, ResourceAddress, ResourceKind};
use template_model::{eval_tmpl_recurse, explode_template, Binding, ExplodeContext, ResolvedBinding, Value};

use crate::error::CatalogError;
use crate::schema::{parse_schema, render_schema};

/// The suffixes this registry recognizes, and the kind each builds.
/// `.localdata` and `.gcsdata` both build `DataLoad`; which storage the
/// payload lives on is a detail of the body, not the kind.
pub const RECOGNIZED_SUFFIXES: &[&str] = &[
    ".view",
    ".querytemplate",
    ".unionview",
    ".uniontable",
    ".localdata",
    ".gcsdata",
    ".bashtemplate",
    ".externaltable",
];

pub fn kind_for_suffix(suffix: &str) -> Option<ResourceKind> {
    match suffix {
        ".view" => Some(ResourceKind::View),
        ".querytemplate" => Some(ResourceKind::Table),
        ".unionview" => Some(ResourceKind::UnionView),
        ".uniontable" => Some(ResourceKind::UnionTable),
        ".localdata" | ".gcsdata" => Some(ResourceKind::DataLoad),
        ".bashtemplate" => Some(ResourceKind::Bash),
        ".externaltable" => Some(ResourceKind::ExternalTable),
        _ => None,
    }
}

fn required_str(resolved: &ResolvedBinding, key: &'static str, source: &str) -> Result<String, CatalogError> {
    match resolved.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(CatalogError::MissingRequiredKey(source.to_string(), key)),
    }
}

fn optional_str(resolved: &ResolvedBinding, key: &str) -> Option<String> {
    resolved.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Explodes and resolves one raw descriptor binding, running (C) then (A)
/// over every element of the Cartesian product.
fn resolve_all(raw: &Binding, ctx: &ExplodeContext, source: &str) -> Result<Vec<ResolvedBinding>, CatalogError> {
    explode_template(raw, ctx)?
        .iter()
        .map(|b| eval_tmpl_recurse(b).map_err(CatalogError::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!(source, "template resolution failed");
            e
        })
}

fn address_from(resolved: &ResolvedBinding, source: &str, allow_empty_table: bool) -> Result<ResourceAddress, CatalogError> {
    let dataset = required_str(resolved, "dataset", source)?;
    let project = optional_str(resolved, "project").unwrap_or_default();
    let table = if allow_empty_table {
        optional_str(resolved, "table").unwrap_or_default()
    } else {
        required_str(resolved, "table", source)?
    };
    Ok(ResourceAddress::new(project, dataset, table))
}

/// Builds one `Resource` per exploded binding — the ordinary case for
/// view/table/data-load/bash/external-table descriptors, where each
/// Cartesian-product element names a distinct target artifact.
pub fn build_one_per_binding(
    raw: &Binding,
    ctx: &ExplodeContext,
    kind: ResourceKind,
    source: &str,
) -> Result<Vec<Resource>, CatalogError> {
    let resolved_all = resolve_all(raw, ctx, source)?;
    resolved_all
        .into_iter()
        .map(|resolved| build_single(resolved, kind, source))
        .collect()
}

fn build_single(resolved: ResolvedBinding, kind: ResourceKind, source: &str) -> Result<Resource, CatalogError> {
    let allow_empty_table = matches!(kind, ResourceKind::View);
    let address = address_from(&resolved, source, allow_empty_table)?;

    let bodies = match kind {
        ResourceKind::View | ResourceKind::Table => vec![required_str(&resolved, "query", source)?],
        ResourceKind::Bash => vec![required_str(&resolved, "command", source)?],
        ResourceKind::ExternalTable => vec![required_str(&resolved, "definition", source)?],
        ResourceKind::DataLoad => build_data_load_body(&resolved, source)?,
        ResourceKind::UnionView | ResourceKind::UnionTable => {
            unreachable!("union kinds are built by build_union, not build_single")
        }
        ResourceKind::Dataset => vec![],
    };

    Ok(Resource { address, kind, bodies, options: resolved })
}

fn build_data_load_body(resolved: &ResolvedBinding, source: &str) -> Result<Vec<String>, CatalogError> {
    let payload = match (optional_str(resolved, "url"), optional_str(resolved, "data")) {
        (Some(url), _) => url,
        (None, Some(data)) => data,
        (None, None) => required_str(resolved, "data", source)?,
    };
    let mut bodies = vec![payload];
    if let Some(schema_text) = optional_str(resolved, "schema") {
        let fields = parse_schema(&schema_text)?;
        bodies.push(render_schema(&fields));
    }
    Ok(bodies)
}

/// Builds the union kinds: the raw descriptor explodes to N bindings the
/// way any other loader's does, but instead of becoming N resources their
/// resolved `query` fields are concatenated with `UNION ALL` into the
/// single body of one resource. Every element must resolve to the same
/// dataset/table — that's what makes them terms of one union rather than
/// N distinct targets.
pub fn build_union(raw: &Binding, ctx: &ExplodeContext, kind: ResourceKind, source: &str) -> Result<Resource, CatalogError> {
    let resolved_all = resolve_all(raw, ctx, source)?;
    let first = resolved_all.first().ok_or_else(|| CatalogError::MissingRequiredKey(source.to_string(), "query"))?;
    let address = address_from(first, source, false)?;

    let mut queries = Vec::with_capacity(resolved_all.len());
    for resolved in &resolved_all {
        let this_address = address_from(resolved, source, false)?;
        if this_address.key() != address.key() {
            return Err(CatalogError::MissingRequiredKey(source.to_string(), "dataset/table must be constant across a union's terms"));
        }
        queries.push(required_str(resolved, "query", source)?);
    }

    let joined = queries.join("\nUNION ALL\n");
    Ok(Resource { address, kind, bodies: vec![joined], options: first.clone() })
}

/// Builds the `DataLoad` resource for a `.localdata` file: the file's own
/// content is the payload (never template-resolved — arbitrary data may
/// contain `{`/`}` that isn't a placeholder), while `metadata` (the
/// loader-merged `dataset`/`project`/`--var` bindings, with no per-file
/// keys of its own) goes through the ordinary explode+resolve pipeline to
/// produce the resource's address. The sibling `.schema` file's parsed
/// fields are rendered back out as the second body element.
pub fn build_local_data_resource(
    metadata: &Binding,
    ctx: &ExplodeContext,
    raw_data: &str,
    schema_text: &str,
    source: &str,
) -> Result<Resource, CatalogError> {
    let resolved = resolve_all(metadata, ctx, source)?
        .into_iter()
        .next()
        .expect("metadata carries no array-valued keys, so it explodes to exactly one binding");
    let address = address_from(&resolved, source, false)?;
    let fields = parse_schema(schema_text)?;
    let bodies = vec![raw_data.to_string(), render_schema(&fields)];
    Ok(Resource { address, kind: ResourceKind::DataLoad, bodies, options: resolved })
}

/// Synthesizes the dataset resource an address implies, if the catalog
/// does not already carry one. Every non-dataset resource's dataset must
/// appear as a dataset node in the graph; loaders are responsible for
/// injecting it since descriptor files never declare datasets directly.
pub fn dataset_resource(project: &str, dataset: &str) -> Resource {
    Resource {
        address: ResourceAddress::new(project, dataset, dataset),
        kind: ResourceKind::Dataset,
        bodies: vec![],
        options: IndexMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> ExplodeContext {
        ExplodeContext {
            effective_date: NaiveDate::from_ymd_opt(2023, 9, 14).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            defaults: IndexMap::new(),
        }
    }

    fn binding(pairs: Vec<(&str, Value)>) -> Binding {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn builds_one_table_per_exploded_binding() {
        let raw = binding(vec![
            ("dataset", Value::Str("ds".into())),
            ("table", Value::Str("{suffix}_t".into())),
            ("suffix", Value::Array(vec![Value::Str("a".into()), Value::Str("b".into())])),
            ("query", Value::Str("select 1".into())),
        ]);
        let resources = build_one_per_binding(&raw, &ctx(), ResourceKind::Table, "t.querytemplate").unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].address.name, "a_t");
        assert_eq!(resources[1].address.name, "b_t");
    }

    #[test]
    fn view_allows_empty_table() {
        let raw = binding(vec![
            ("dataset", Value::Str("ds".into())),
            ("table", Value::Str("".into())),
            ("query", Value::Str("select 1".into())),
        ]);
        let resources = build_one_per_binding(&raw, &ctx(), ResourceKind::View, "v.view").unwrap();
        assert_eq!(resources[0].address.name, "");
    }

    #[test]
    fn table_requires_nonempty_name() {
        let raw = binding(vec![
            ("dataset", Value::Str("ds".into())),
            ("table", Value::Str("".into())),
            ("query", Value::Str("select 1".into())),
        ]);
        let err = build_one_per_binding(&raw, &ctx(), ResourceKind::Table, "t.querytemplate").unwrap_err();
        assert!(matches!(err, CatalogError::MissingRequiredKey(_, "table")));
    }

    #[test]
    fn union_table_concatenates_terms_into_one_resource() {
        let raw = binding(vec![
            ("dataset", Value::Str("ds".into())),
            ("table", Value::Str("merged".into())),
            ("source", Value::Array(vec![Value::Str("a".into()), Value::Str("b".into())])),
            ("query", Value::Str("select * from {source}".into())),
        ]);
        let resource = build_union(&raw, &ctx(), ResourceKind::UnionTable, "u.uniontable").unwrap();
        assert_eq!(resource.bodies.len(), 1);
        assert!(resource.bodies[0].contains("UNION ALL"));
        assert!(resource.bodies[0].contains("from a"));
        assert!(resource.bodies[0].contains("from b"));
    }

    #[test]
    fn local_data_resource_carries_raw_content_untouched() {
        let mut metadata_ctx = ctx();
        metadata_ctx.defaults = binding(vec![
            ("filename", Value::Str("mytable".into())),
            ("folder", Value::Str("fixtures".into())),
        ]);
        let metadata = binding(vec![("dataset", Value::Str("ds".into())), ("project", Value::Str("proj".into()))]);
        let resource = build_local_data_resource(
            &metadata,
            &metadata_ctx,
            "a,b\n{not a placeholder},2\n",
            "id:INTEGER,name:STRING",
            "t.localdata",
        )
        .unwrap();
        assert_eq!(resource.address.name, "mytable");
        assert_eq!(resource.bodies[0], "a,b\n{not a placeholder},2\n");
        assert_eq!(resource.bodies[1], "id:INTEGER,name:STRING");
    }
}
