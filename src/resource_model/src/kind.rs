use std::fmt;

/// The closed set of resource variants. A tagged enum rather than an
/// open hierarchy: the kind set is finite and fixed, so a sum type maps
/// more directly onto it than trait-object polymorphism would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    View,
    Table,
    UnionView,
    UnionTable,
    DataLoad,
    ExternalTable,
    Bash,
    Dataset,
}

impl ResourceKind {
    /// The file suffix a loader in the resource catalog recognizes for
    /// this kind, where one exists (`Dataset` has no descriptor file of
    /// its own — it's auto-injected by loaders for every dataset a
    /// sibling resource addresses).
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            ResourceKind::View => Some(".view"),
            ResourceKind::Table => Some(".querytemplate"),
            ResourceKind::UnionView => Some(".unionview"),
            ResourceKind::UnionTable => Some(".uniontable"),
            ResourceKind::DataLoad => None, // .localdata or .gcsdata, see resource_catalog::loader
            ResourceKind::ExternalTable => Some(".externaltable"),
            ResourceKind::Bash => Some(".bashtemplate"),
            ResourceKind::Dataset => None,
        }
    }

    pub fn is_dataset(self) -> bool {
        matches!(self, ResourceKind::Dataset)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::View => "view",
            ResourceKind::Table => "table",
            ResourceKind::UnionView => "union-view",
            ResourceKind::UnionTable => "union-table",
            ResourceKind::DataLoad => "data-load",
            ResourceKind::ExternalTable => "external-table",
            ResourceKind::Bash => "bash",
            ResourceKind::Dataset => "dataset",
        };
        write!(f, "{s}")
    }
}
