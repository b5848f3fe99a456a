//! Storage module for file management
//!
//! Local filesystem storage: owner/visibility folder layout, UUID-based
//! stored names, and the physical write/delete primitives used by uploads.

mod files;
mod layout;
mod naming;

pub use files::{copy_stream, create_new_file, remove_file_if_exists, write_payload};
pub use layout::{build_target_folder, OwnerScope};
pub use naming::{file_extension, parse_resource_id, resource_id_from_url, stored_file_name};
