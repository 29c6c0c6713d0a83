use std::fmt;

/// `(project, dataset, name)` — identifies a warehouse artifact.
///
/// `project` is advisory: the canonical dependency-graph key is
/// `dataset:name` alone, so two resources with the same dataset/name but
/// different `project` values collide (and a [`crate::resource::Resource`]
/// that loaded them with divergent bodies is a fatal duplicate-key error,
/// not a distinct node).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    pub project: String,
    pub dataset: String,
    pub name: String,
}

impl ResourceAddress {
    pub fn new(project: impl Into<String>, dataset: impl Into<String>, name: impl Into<String>) -> Self {
        ResourceAddress {
            project: project.into(),
            dataset: dataset.into(),
            name: name.into(),
        }
    }

    /// The canonical dependency-graph key: `dataset:name`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.dataset, self.name)
    }

    /// Every qualified-identifier spelling this address might appear
    /// under in rendered SQL: the modern `dataset.table` form, the
    /// standard backticked `project.dataset.table` form, and the legacy
    /// bracketed `project:dataset.table` form. `project` may itself
    /// already embed a `qualifier` segment (e.g. `"myproject:qualifier"`),
    /// which these three spellings carry through unchanged.
    pub fn qualified_forms(&self) -> Vec<String> {
        vec![
            format!("{}.{}", self.dataset, self.name),
            format!("{}.{}.{}", self.project, self.dataset, self.name),
            format!("{}:{}.{}", self.project, self.dataset, self.name),
        ]
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_dataset_colon_name() {
        let a = ResourceAddress::new("proj", "ds", "tbl");
        assert_eq!(a.key(), "ds:tbl");
    }

    #[test]
    fn qualified_forms_cover_modern_and_legacy_spellings() {
        let a = ResourceAddress::new("yourproject:qualifier", "test", "kw_features_ranked");
        let forms = a.qualified_forms();
        assert!(forms.contains(&"test.kw_features_ranked".to_string()));
        assert!(forms.contains(&"yourproject:qualifier.test.kw_features_ranked".to_string()));
        assert!(forms.contains(&"yourproject:qualifier:test.kw_features_ranked".to_string()));
    }
}
