use crate::error::CatalogError;

/// One declared column of a `.localdata` load, parsed from the sibling
/// `.schema` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub type_name: String,
}

/// Parses a `.schema` sidecar file: either a JSON array of `{"name":
/// ..., "type": ...}` objects, or a CSV line of `name:type,name2:type2`.
pub fn parse_schema(text: &str) -> Result<Vec<SchemaField>, CatalogError> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        let raw: Vec<serde_json::Value> = serde_json::from_str(trimmed)
            .map_err(|e| CatalogError::Parse("<schema>".to_string(), e.to_string()))?;
        raw.into_iter()
            .map(|v| {
                let name = v
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| CatalogError::Parse("<schema>".to_string(), "missing 'name' in schema entry".to_string()))?
                    .to_string();
                let type_name = v
                    .get("type")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| CatalogError::Parse("<schema>".to_string(), "missing 'type' in schema entry".to_string()))?
                    .to_string();
                Ok(SchemaField { name, type_name })
            })
            .collect()
    } else {
        trimmed
            .split(',')
            .filter(|field| !field.trim().is_empty())
            .map(|field| {
                let (name, type_name) = field.split_once(':').ok_or_else(|| {
                    CatalogError::Parse("<schema>".to_string(), format!("malformed schema field '{field}'"))
                })?;
                Ok(SchemaField {
                    name: name.trim().to_string(),
                    type_name: type_name.trim().to_string(),
                })
            })
            .collect()
    }
}

/// Renders a schema back into the `name:type,...` CSV form used to store
/// it alongside the loaded data as a resource body.
pub fn render_schema(fields: &[SchemaField]) -> String {
    fields
        .iter()
        .map(|f| format!("{}:{}", f.name, f.type_name))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_schema() {
        let fields = parse_schema("id:INTEGER,name:STRING").unwrap();
        assert_eq!(
            fields,
            vec![
                SchemaField { name: "id".into(), type_name: "INTEGER".into() },
                SchemaField { name: "name".into(), type_name: "STRING".into() },
            ]
        );
    }

    #[test]
    fn parses_json_schema() {
        let fields = parse_schema(r#"[{"name":"id","type":"INTEGER"}]"#).unwrap();
        assert_eq!(fields, vec![SchemaField { name: "id".into(), type_name: "INTEGER".into() }]);
    }

    #[test]
    fn csv_roundtrips_through_render() {
        let fields = parse_schema("id:INTEGER,name:STRING").unwrap();
        assert_eq!(render_schema(&fields), "id:INTEGER,name:STRING");
    }
}
