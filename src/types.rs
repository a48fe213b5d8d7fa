use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Identifier assigned to a job by the grid master.
///
/// Ids start at 1, increase strictly and are never reused within the
/// lifetime of a master.
pub type JobId = u64;

/// Reserved token in stdout/stderr path templates that is replaced by the
/// assigned job id.
pub const JOB_ID_PLACEHOLDER: &str = "%J";

/// Boxed, sendable future used at the trait seams (executor backend,
/// cluster interface).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Substitute every [`JOB_ID_PLACEHOLDER`] in `template` with `id`.
pub fn resolve_job_placeholder(template: &str, id: JobId) -> String {
    template.replace(JOB_ID_PLACEHOLDER, &id.to_string())
}

/// Path flavour of [`resolve_job_placeholder`].
pub fn resolve_job_path(template: &Path, id: JobId) -> PathBuf {
    PathBuf::from(resolve_job_placeholder(&template.to_string_lossy(), id))
}
