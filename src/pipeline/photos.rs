//! Photo location: pick special-purpose images and group the rest by room.
//!
//! A photo tree is scanned once into a [`PhotoIndex`]; every query after
//! that is an in-memory filter. The scan walks depth-first with each
//! directory's entries sorted by file name, so the candidate order is the
//! component-wise lexicographic order of the paths and does not depend on
//! the platform's directory-listing order. "First match wins" in
//! [`PhotoIndex::find_special`] therefore means "lexicographically first".
//!
//! Room matching is best-effort and not exclusive: an image whose name or
//! parent folder mentions two categories' keywords lands in both groups.

use crate::claim::RoomPhotoGroup;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Image extensions considered, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Maximum images kept per room category.
pub const MAX_IMAGES_PER_ROOM: usize = 4;

/// A named room and the keywords that identify its photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

impl RoomCategory {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// The standard residential categories, in report order.
    pub fn defaults() -> Vec<RoomCategory> {
        vec![
            RoomCategory::new("BEDROOM1", &["bedroom1", "master"]),
            RoomCategory::new("BEDROOM2", &["bedroom2", "second"]),
            RoomCategory::new("KITCHEN", &["kitchen"]),
            RoomCategory::new("LIVING", &["living", "lounge"]),
            RoomCategory::new("STORAGE", &["storage", "basement"]),
        ]
    }

    fn matches(&self, photo: &Path) -> bool {
        let name = lower_file_name(photo);
        let parent = photo
            .parent()
            .map(lower_file_name)
            .unwrap_or_default();
        self.keywords
            .iter()
            .any(|kw| name.contains(kw.as_str()) || parent.contains(kw.as_str()))
    }
}

/// Keywords identifying the special images of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialImageKeywords {
    pub header: Vec<String>,
    pub footer: Vec<String>,
    pub front: Vec<String>,
}

impl Default for SpecialImageKeywords {
    fn default() -> Self {
        Self {
            header: vec!["header".into()],
            footer: vec!["footer".into()],
            front: vec!["front".into(), "facade".into()],
        }
    }
}

/// Every candidate image under a photo root, in traversal order.
#[derive(Debug, Clone, Default)]
pub struct PhotoIndex {
    images: Vec<PathBuf>,
}

impl PhotoIndex {
    /// Scan `root` recursively for images.
    ///
    /// Paths are made absolute so the PDF engine can embed them from any
    /// working directory. Entries that cannot be read are skipped.
    pub fn scan(root: &Path) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

        let images: Vec<PathBuf> = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!("Skipping unreadable photo entry: {}", e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && is_image(e.path()))
            .map(|e| e.into_path())
            .collect();

        debug!("Indexed {} photos under {}", images.len(), root.display());
        Self { images }
    }

    /// Build an index from already-known paths (kept in the given order).
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            images: paths.into_iter().filter(|p| is_image(p)).collect(),
        }
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// First image whose file name contains any of `keywords`.
    pub fn find_special<S: AsRef<str>>(&self, keywords: &[S]) -> Option<PathBuf> {
        let keywords: Vec<String> = keywords.iter().map(|k| k.as_ref().to_lowercase()).collect();
        self.images
            .iter()
            .find(|photo| {
                let name = lower_file_name(photo);
                keywords.iter().any(|kw| name.contains(kw.as_str()))
            })
            .cloned()
    }

    /// Group images into `categories`, skipping anything in `claimed`.
    ///
    /// Groups follow category order, hold at most
    /// [`MAX_IMAGES_PER_ROOM`] lexicographically sorted paths, and are
    /// omitted entirely when nothing matched.
    pub fn organize_rooms(
        &self,
        categories: &[RoomCategory],
        claimed: &[PathBuf],
    ) -> Vec<RoomPhotoGroup> {
        categories
            .iter()
            .filter_map(|category| {
                let mut matched: Vec<PathBuf> = self
                    .images
                    .iter()
                    .filter(|photo| !claimed.contains(photo) && category.matches(photo))
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    return None;
                }
                matched.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
                matched.truncate(MAX_IMAGES_PER_ROOM);
                Some(RoomPhotoGroup {
                    room: category.name.clone(),
                    images: matched,
                })
            })
            .collect()
    }
}

/// Scan `root` and return the first image whose name contains a keyword.
pub fn find_special<S: AsRef<str>>(root: &Path, keywords: &[S]) -> Option<PathBuf> {
    PhotoIndex::scan(root).find_special(keywords)
}

/// Scan `root` and group its images into the default room categories.
pub fn organize_rooms(root: &Path, claimed: &[PathBuf]) -> Vec<RoomPhotoGroup> {
    PhotoIndex::scan(root).organize_rooms(&RoomCategory::defaults(), claimed)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ok| e.eq_ignore_ascii_case(ok)))
        .unwrap_or(false)
}

fn lower_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"img").unwrap();
        path
    }

    fn tree() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = std::path::absolute(dir.path()).unwrap();
        touch(&root, "branding/Header_Logo.PNG");
        touch(&root, "branding/footer.jpg");
        touch(&root, "exterior/Front-Elevation.jpeg");
        touch(&root, "exterior/facade.jpg");
        touch(&root, "Kitchen/img_01.jpg");
        touch(&root, "Kitchen/img_02.jpg");
        touch(&root, "misc/kitchen_sink.png");
        touch(&root, "misc/master_closet.jpg");
        touch(&root, "misc/notes.txt");
        touch(&root, "misc/kitchen.gif");
        for i in 0..6 {
            touch(&root, &format!("lounge/photo_{i}.jpg"));
        }
        (dir, root)
    }

    #[test]
    fn only_image_extensions_are_indexed() {
        let (_dir, root) = tree();
        let index = PhotoIndex::scan(&root);
        assert_eq!(index.images().len(), 14);
        assert!(index
            .images()
            .iter()
            .all(|p| p.is_absolute() && is_image(p)));
    }

    #[test]
    fn find_special_is_case_insensitive_and_ordered() {
        let (_dir, root) = tree();
        let index = PhotoIndex::scan(&root);
        assert_eq!(
            index.find_special(&["HEADER"]),
            Some(root.join("branding/Header_Logo.PNG"))
        );
        // Both match; names sort bytewise, so "Front-..." precedes "facade".
        assert_eq!(
            index.find_special(&["front", "facade"]),
            Some(root.join("exterior/Front-Elevation.jpeg"))
        );
        assert_eq!(index.find_special(&["drone"]), None);
    }

    #[test]
    fn find_special_is_idempotent() {
        let (_dir, root) = tree();
        let first = find_special(&root, &["footer"]);
        let second = find_special(&root, &["footer"]);
        assert_eq!(first, second);
        assert_eq!(first, Some(root.join("branding/footer.jpg")));
    }

    #[test]
    fn rooms_match_on_name_or_parent_folder() {
        let (_dir, root) = tree();
        let groups = organize_rooms(&root, &[]);
        let names: Vec<&str> = groups.iter().map(|g| g.room.as_str()).collect();
        assert_eq!(names, vec!["BEDROOM1", "KITCHEN", "LIVING"]);

        let kitchen = &groups[1];
        assert_eq!(
            kitchen.images,
            vec![
                root.join("Kitchen/img_01.jpg"),
                root.join("Kitchen/img_02.jpg"),
                root.join("misc/kitchen_sink.png"),
            ]
        );
    }

    #[test]
    fn rooms_are_capped_at_four_sorted_images() {
        let (_dir, root) = tree();
        let groups = organize_rooms(&root, &[]);
        let living = groups.iter().find(|g| g.room == "LIVING").unwrap();
        assert_eq!(living.images.len(), MAX_IMAGES_PER_ROOM);
        assert_eq!(living.images[0], root.join("lounge/photo_0.jpg"));
        assert_eq!(living.images[3], root.join("lounge/photo_3.jpg"));
    }

    #[test]
    fn rooms_sort_by_full_path_text() {
        // '-' sorts before '/', so "Kitchen-2/..." precedes "Kitchen/...".
        let index = PhotoIndex::from_paths(vec![
            PathBuf::from("/p/Kitchen/a.jpg"),
            PathBuf::from("/p/Kitchen-2/b.jpg"),
        ]);
        let groups = index.organize_rooms(&RoomCategory::defaults(), &[]);
        assert_eq!(
            groups[0].images,
            vec![
                PathBuf::from("/p/Kitchen-2/b.jpg"),
                PathBuf::from("/p/Kitchen/a.jpg"),
            ]
        );
    }

    #[test]
    fn claimed_images_are_excluded() {
        let (_dir, root) = tree();
        let claimed = vec![root.join("misc/master_closet.jpg")];
        let groups = organize_rooms(&root, &claimed);
        assert!(groups.iter().all(|g| g.room != "BEDROOM1"));
    }

    #[test]
    fn missing_root_yields_empty_index() {
        let index = PhotoIndex::scan(Path::new("/no/such/photo/root"));
        assert!(index.is_empty());
    }

    proptest! {
        #[test]
        fn groups_are_nonempty_bounded_and_sorted(
            names in proptest::collection::vec(
                "(Kitchen|Kitchen-2|Kitchen_old|misc)/(kitchen|lounge|master|attic)_[a-z]{1,6}\\.(jpg|png)",
                0..24,
            )
        ) {
            let index = PhotoIndex::from_paths(
                names.iter().map(|n| PathBuf::from("/photos").join(n)),
            );
            let categories = RoomCategory::defaults();
            let groups = index.organize_rooms(&categories, &[]);
            for group in groups {
                prop_assert!(!group.images.is_empty());
                prop_assert!(group.images.len() <= MAX_IMAGES_PER_ROOM);

                // The kept images are the first ones in path-text order.
                let category = categories.iter().find(|c| c.name == group.room).unwrap();
                let mut expected: Vec<String> = index
                    .images()
                    .iter()
                    .filter(|p| category.matches(p))
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                expected.sort();
                expected.truncate(MAX_IMAGES_PER_ROOM);
                let got: Vec<String> = group
                    .images
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                prop_assert_eq!(got, expected);
            }
        }
    }
}
