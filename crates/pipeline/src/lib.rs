//! Workshop item flows: publish, update, delete, list.
//!
//! This crate holds the orchestration logic only. The binary supplies a
//! [`WorkshopClient`](wspublish_workshop::WorkshopClient) and renders the
//! [`PipelineEvent`]s it receives.
//!
//! # Publish / update
//!
//! 1. **Validate**: item name, manifest, preview image
//! 2. **Archive**: zip the item folder in memory
//! 3. **Upload**: write archive and preview to cloud storage
//! 4. **Share**: mark both cloud files shared and wait for completion
//! 5. **Verify**: both files must now exist in the cloud
//! 6. **Publish/Update**: register or refresh the listing
//!
//! Every flow stops at the first failing stage. Cloud files created by a
//! failed publish are removed again.

mod error;
mod pipeline;
mod prepare;
mod types;

pub use error::{PipelineError, PipelineFailure};
pub use pipeline::Pipeline;
pub use prepare::{PreparedItem, prepare_item};
pub use types::{ItemOutcome, ListMode, ListReport, PipelineEvent, PipelineOptions, Stage, TOOL_TAG};
