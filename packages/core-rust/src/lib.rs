//! Git export core: export job model, validation, deterministic branch
//! naming, and the status callback payload.

pub mod job;
pub mod naming;
pub mod result;
pub mod types;

pub use job::{ExportJob, ExportRequest, ValidationError};
pub use naming::{adr_file_path, branch_name, slugify};
pub use result::{CallbackPayload, CallbackStatus, ExportResult, RpcEnvelope};
pub use types::{FileWriteIntent, RemoteRef, ReviewRequestDraft};
