mod media_file_repository;
#[cfg(test)]
mod memory;

pub use media_file_repository::{MediaFileRepository, PgMediaFileRepository};
#[cfg(test)]
pub use memory::InMemoryMediaFileRepository;
