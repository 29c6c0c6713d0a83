use template_model::Binding;

use crate::address::ResourceAddress;
use crate::backend::{JobHandle, WarehouseBackend, WarehouseError};
use crate::fingerprint::fingerprint;
use crate::kind::ResourceKind;
use crate::substring::strict_substring;

/// One materialized target artifact: a view, a query-backed table, a
/// union of several queries, a local or object-storage data load, an
/// external table definition, a bash-backed table, or a dataset.
///
/// Immutable after construction — the only thing that varies run to run
/// is what the warehouse reports back about it, which is fetched fresh
/// through [`WarehouseBackend`] rather than cached on the struct.
#[derive(Debug, Clone)]
pub struct Resource {
    pub address: ResourceAddress,
    pub kind: ResourceKind,
    /// One or more rendered SQL strings (multiple for union-view/table),
    /// a data-URL, a bash command, or an external table definition.
    pub bodies: Vec<String>,
    /// The fully-resolved binding that produced this resource. Carried
    /// for `dump()` and for the duplicate-key divergence check.
    pub options: Binding,
}

impl Resource {
    pub fn key(&self) -> String {
        self.address.key()
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.bodies)
    }

    /// The rendered definition, for offline inspection (`--dotml`,
    /// `--dumpToFolder`, `--showJobs`).
    pub fn dump(&self) -> String {
        self.bodies.join("\n;\n")
    }

    /// Two loads producing the same key must carry byte-identical bodies
    /// and options; this is the check that decides whether a repeat load
    /// is a harmless duplicate or a fatal `DuplicateKeyDivergent`.
    pub fn is_identical_definition(&self, other: &Resource) -> bool {
        self.kind == other.kind && self.bodies == other.bodies && self.options == other.options
    }

    /// Static lexical test: does this resource's rendered body refer to
    /// `other`'s address?
    ///
    /// - Self-dependency is always false.
    /// - Dataset resources never depend on anything (they carry no SQL).
    /// - A dependency on a dataset resource is a free-identifier match on
    ///   that dataset's bare id.
    /// - A dependency on any other resource is a [`strict_substring`]
    ///   match against its modern and legacy qualified-identifier
    ///   spellings.
    pub fn depends_on(&self, other: &Resource) -> bool {
        if self.key() == other.key() {
            return false;
        }
        if self.kind.is_dataset() {
            return false;
        }
        if other.kind.is_dataset() {
            return self
                .bodies
                .iter()
                .any(|body| strict_substring(&other.address.dataset, body));
        }
        let candidates = other.address.qualified_forms();
        self.bodies
            .iter()
            .any(|body| candidates.iter().any(|c| strict_substring(c, body)))
    }

    pub async fn exists(&self, backend: &dyn WarehouseBackend) -> Result<bool, WarehouseError> {
        Ok(backend.metadata(&self.address).await?.exists)
    }

    pub async fn is_running(&self, backend: &dyn WarehouseBackend) -> Result<bool, WarehouseError> {
        Ok(backend.metadata(&self.address).await?.running_job.is_some())
    }

    /// Does the stored artifact's metadata fingerprint differ from this
    /// resource's current fingerprint (i.e. has the definition changed
    /// since the last run)?
    pub async fn should_update(&self, backend: &dyn WarehouseBackend) -> Result<bool, WarehouseError> {
        let meta = backend.metadata(&self.address).await?;
        if !meta.exists {
            return Ok(true);
        }
        let drifted = meta.description_fingerprint.as_deref() != Some(self.fingerprint().as_str());
        if drifted {
            tracing::debug!(key = %self.key(), "definition fingerprint drifted, resource needs update");
        } else {
            tracing::debug!(key = %self.key(), "resource is up to date");
        }
        Ok(drifted)
    }

    pub async fn update_time(&self, backend: &dyn WarehouseBackend) -> Result<Option<i64>, WarehouseError> {
        Ok(backend.metadata(&self.address).await?.last_modified_ms)
    }

    pub async fn running_job(&self, backend: &dyn WarehouseBackend) -> Result<Option<JobHandle>, WarehouseError> {
        Ok(backend.metadata(&self.address).await?.running_job)
    }

    /// Submits the warehouse operation to (re)materialize this resource.
    /// Returns once the job is accepted; does not wait for completion.
    pub async fn create(&self, backend: &dyn WarehouseBackend) -> Result<JobHandle, WarehouseError> {
        backend.submit_create(self).await
    }
}
