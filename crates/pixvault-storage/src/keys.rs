//! Blob key construction.
//!
//! All artifacts of a file live next to each other under the file's folder:
//! the original at `{library}/{folder_path}/{file}`, thumbnails under
//! `tn_{size}/`, and the converted video under `cnv/`. `folder_path` is the
//! folder's slash-joined ancestor-ID path, empty for the library root.

use pixvault_core::ThumbnailSize;
use uuid::Uuid;

/// Prefix owned by a library; deleting it removes every blob of the library.
pub fn library_prefix(library_id: Uuid) -> String {
    library_id.to_string()
}

/// Prefix owned by a folder.
pub fn folder_prefix(library_id: Uuid, folder_path: &str) -> String {
    join(&library_id.to_string(), folder_path)
}

/// Key of a file's original bytes.
pub fn original_key(library_id: Uuid, folder_path: &str, file_id: Uuid) -> String {
    join(&folder_prefix(library_id, folder_path), &file_id.to_string())
}

/// Key of one thumbnail variant.
pub fn thumbnail_key(
    library_id: Uuid,
    folder_path: &str,
    file_id: Uuid,
    size: ThumbnailSize,
) -> String {
    let dir = join(&folder_prefix(library_id, folder_path), &format!("tn_{}", size));
    join(&dir, &file_id.to_string())
}

/// Key of the converted (MP4) rendition of a video.
pub fn converted_key(library_id: Uuid, folder_path: &str, file_id: Uuid) -> String {
    let dir = join(&folder_prefix(library_id, folder_path), "cnv");
    join(&dir, &file_id.to_string())
}

/// Parent of a library-relative blob path ("" when the path has one segment).
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

fn join(base: &str, rest: &str) -> String {
    if rest.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_folder_keys_omit_the_empty_path_segment() {
        let library = Uuid::new_v4();
        let file = Uuid::new_v4();
        assert_eq!(
            original_key(library, "", file),
            format!("{}/{}", library, file)
        );
        assert_eq!(
            thumbnail_key(library, "", file, ThumbnailSize::Sm),
            format!("{}/tn_sm/{}", library, file)
        );
    }

    #[test]
    fn nested_folder_keys_include_the_folder_path() {
        let library = Uuid::new_v4();
        let file = Uuid::new_v4();
        assert_eq!(
            original_key(library, "a/b", file),
            format!("{}/a/b/{}", library, file)
        );
        assert_eq!(
            converted_key(library, "a/b", file),
            format!("{}/a/b/cnv/{}", library, file)
        );
        assert_eq!(
            thumbnail_key(library, "a/b", file, ThumbnailSize::Lg),
            format!("{}/a/b/tn_lg/{}", library, file)
        );
    }

    #[test]
    fn parent_path_strips_the_last_segment() {
        assert_eq!(parent_path("a/b/c"), "a/b");
        assert_eq!(parent_path("c"), "");
        assert_eq!(parent_path(""), "");
    }
}
