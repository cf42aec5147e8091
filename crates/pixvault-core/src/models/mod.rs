pub mod file;
pub mod folder;
pub mod library;

pub use file::{CapturedMetadata, FileAdd, FileUpdate, MediaFile};
pub use folder::{Folder, FolderStats};
pub use library::{Library, LibraryAdd};
