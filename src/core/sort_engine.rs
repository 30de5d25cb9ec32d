/*
 * Deterministic ordering of sibling entries for both the tree and the list.
 * The parent placeholder is lifted out before sorting and put back first,
 * folders are sorted as their own block and placed above or below the files,
 * and all comparisons go through a natural-order comparator so that
 * `file2` sorts before `file10`. Sorting is stable: entries with equal keys
 * keep their input order, which makes `sort` idempotent.
 */
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::core::config::SortConfig;
use crate::core::models::ResourceDescriptor;
use crate::core::path_model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Type,
    Size,
    Modified,
    Dimensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderPosition {
    #[default]
    Top,
    Bottom,
}

// The active sort parameters. Shared by TreeStore and ListStore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
    pub folder_position: FolderPosition,
    pub case_sensitive: bool,
}

impl SortSpec {
    pub fn from_config(config: &SortConfig) -> Self {
        SortSpec {
            field: config.field,
            order: config.order,
            folder_position: config.folder_position,
            case_sensitive: config.case_sensitive,
        }
    }

    /*
     * Selecting the active field again flips the order; selecting a new field
     * switches to it in ascending order.
     */
    pub fn toggled(&self, field: SortField) -> Self {
        let order = if self.field == field {
            self.order.flipped()
        } else {
            SortOrder::Asc
        };
        SortSpec {
            field,
            order,
            ..*self
        }
    }
}

// Anything that can be ordered by the sort engine.
pub trait SortableEntry {
    fn descriptor(&self) -> &ResourceDescriptor;
}

impl SortableEntry for ResourceDescriptor {
    fn descriptor(&self) -> &ResourceDescriptor {
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Text(String),
    Number(i128),
}

fn normalize_text(text: &str, case_sensitive: bool) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if case_sensitive {
        collapsed
    } else {
        collapsed.to_lowercase()
    }
}

fn sort_key(descriptor: &ResourceDescriptor, spec: &SortSpec) -> SortKey {
    let attrs = &descriptor.attributes;
    match spec.field {
        SortField::Name => SortKey::Text(normalize_text(&attrs.name, spec.case_sensitive)),
        SortField::Type => {
            let ext = if descriptor.is_folder() {
                String::new()
            } else {
                path_model::extension(&attrs.name).unwrap_or_default()
            };
            SortKey::Text(normalize_text(&ext, spec.case_sensitive))
        }
        SortField::Size => SortKey::Number(attrs.size as i128),
        SortField::Modified => SortKey::Number(attrs.timestamp as i128),
        SortField::Dimensions => {
            let area = attrs.width.unwrap_or(0) as i128 * attrs.height.unwrap_or(0) as i128;
            SortKey::Number(area)
        }
    }
}

/*
 * Natural-order string comparison: `file2` before `file10`. Strings the
 * comparator considers equal (leading zeros) fall back to plain comparison so
 * the result is still a total order.
 */
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    alphanumeric_sort::compare_str(a, b).then_with(|| a.cmp(b))
}

fn compare_keys(a: &SortKey, b: &SortKey, order: SortOrder) -> Ordering {
    let ord = match (a, b) {
        (SortKey::Text(x), SortKey::Text(y)) => natural_cmp(x, y),
        (SortKey::Number(x), SortKey::Number(y)) => x.cmp(y),
        _ => Ordering::Equal,
    };
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

fn sort_block<T: SortableEntry>(block: Vec<T>, spec: &SortSpec) -> Vec<T> {
    let mut keyed: Vec<(SortKey, T)> = block
        .into_iter()
        .map(|entry| (sort_key(entry.descriptor(), spec), entry))
        .collect();
    // `sort_by` is stable, equal keys keep their relative order.
    keyed.sort_by(|a, b| compare_keys(&a.0, &b.0, spec.order));
    keyed.into_iter().map(|(_, entry)| entry).collect()
}

/*
 * Sorts `entries` according to `spec`. The first parent placeholder (if any)
 * ends up first, followed by the folder block and the file block in the order
 * given by `spec.folder_position`.
 */
pub fn sort<T: SortableEntry>(entries: Vec<T>, spec: &SortSpec) -> Vec<T> {
    let mut placeholder: Option<T> = None;
    let mut folders = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        let descriptor = entry.descriptor();
        if descriptor.is_placeholder() && placeholder.is_none() {
            placeholder = Some(entry);
        } else if descriptor.is_folder() {
            folders.push(entry);
        } else {
            files.push(entry);
        }
    }

    let folders = sort_block(folders, spec);
    let files = sort_block(files, spec);

    let mut result = Vec::with_capacity(folders.len() + files.len() + 1);
    if let Some(p) = placeholder {
        result.push(p);
    }
    match spec.folder_position {
        FolderPosition::Top => {
            result.extend(folders);
            result.extend(files);
        }
        FolderPosition::Bottom => {
            result.extend(files);
            result.extend(folders);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ResourceDescriptor;
    use rand::seq::SliceRandom;

    fn names(entries: &[ResourceDescriptor]) -> Vec<&str> {
        entries.iter().map(|d| d.name()).collect()
    }

    fn sample() -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::file("/d/file10.txt", 300, 30),
            ResourceDescriptor::file("/d/File2.txt", 100, 10),
            ResourceDescriptor::folder("/d/beta/", 5),
            ResourceDescriptor::file("/d/image.png", 200, 20),
            ResourceDescriptor::folder("/d/Alpha/", 6),
            ResourceDescriptor::file("/d/file1.txt", 400, 40),
        ]
    }

    #[test]
    fn test_natural_cmp_numeric_runs() {
        assert_eq!(natural_cmp("file2", "file10"), Ordering::Less);
        assert_eq!(natural_cmp("file10", "file2"), Ordering::Greater);
        assert_eq!(natural_cmp("a", "a"), Ordering::Equal);
        assert_eq!(natural_cmp("a1b", "a1c"), Ordering::Less);
        assert_eq!(natural_cmp("x", "x1"), Ordering::Less);
        assert_eq!(natural_cmp("1x", "x"), Ordering::Less);
    }

    #[test]
    fn test_natural_cmp_leading_zeros_is_total() {
        assert_ne!(natural_cmp("a01", "a1"), Ordering::Equal);
        assert_eq!(natural_cmp("a01", "a1"), natural_cmp("a1", "a01").reverse());
    }

    #[test]
    fn test_natural_cmp_huge_numbers_do_not_overflow() {
        assert_eq!(
            natural_cmp("v99999999999999999999999", "v100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn test_sort_by_name_folders_top() {
        // Arrange
        let spec = SortSpec::default();

        // Act
        let sorted = sort(sample(), &spec);

        // Assert
        assert_eq!(
            names(&sorted),
            vec!["Alpha", "beta", "file1.txt", "File2.txt", "file10.txt", "image.png"]
        );
    }

    #[test]
    fn test_sort_folders_bottom_descending() {
        let spec = SortSpec {
            order: SortOrder::Desc,
            folder_position: FolderPosition::Bottom,
            ..SortSpec::default()
        };

        let sorted = sort(sample(), &spec);

        assert_eq!(
            names(&sorted),
            vec!["image.png", "file10.txt", "File2.txt", "file1.txt", "beta", "Alpha"]
        );
    }

    #[test]
    fn test_sort_case_sensitive_puts_uppercase_first() {
        let spec = SortSpec {
            case_sensitive: true,
            ..SortSpec::default()
        };

        let sorted = sort(sample(), &spec);

        assert_eq!(
            names(&sorted),
            vec!["Alpha", "beta", "File2.txt", "file1.txt", "file10.txt", "image.png"]
        );
    }

    #[test]
    fn test_sort_by_size_numeric() {
        let spec = SortSpec {
            field: SortField::Size,
            ..SortSpec::default()
        };

        let sorted = sort(sample(), &spec);

        // Folders keep input order (equal size), files by size.
        assert_eq!(
            names(&sorted),
            vec!["beta", "Alpha", "File2.txt", "image.png", "file10.txt", "file1.txt"]
        );
    }

    #[test]
    fn test_sort_by_type_groups_extensions() {
        let spec = SortSpec {
            field: SortField::Type,
            ..SortSpec::default()
        };

        let sorted = sort(sample(), &spec);

        assert_eq!(
            names(&sorted)[2..],
            ["image.png", "file10.txt", "File2.txt", "file1.txt"]
        );
    }

    #[test]
    fn test_placeholder_stays_first() {
        let mut entries = sample();
        entries.insert(3, ResourceDescriptor::parent_placeholder("/d/"));
        let spec = SortSpec {
            order: SortOrder::Desc,
            folder_position: FolderPosition::Bottom,
            ..SortSpec::default()
        };

        let sorted = sort(entries, &spec);

        assert!(sorted[0].is_placeholder());
        assert_eq!(sorted.len(), 7);
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let spec = SortSpec::default();
        let entries = vec![
            ResourceDescriptor::file("/d/b  c.txt", 1, 0),
            ResourceDescriptor::file("/d/b c.txt", 1, 0),
            ResourceDescriptor::file("/d/a.txt", 1, 0),
        ];

        let sorted = sort(entries, &spec);

        // The two "b c" names compare equal and keep their input order.
        assert_eq!(names(&sorted), vec!["a.txt", "b  c.txt", "b c.txt"]);
    }

    #[test]
    fn test_sort_is_idempotent_for_shuffled_input() {
        let mut rng = rand::rng();
        let specs = [
            SortSpec::default(),
            SortSpec {
                field: SortField::Modified,
                order: SortOrder::Desc,
                ..SortSpec::default()
            },
            SortSpec {
                field: SortField::Size,
                folder_position: FolderPosition::Bottom,
                ..SortSpec::default()
            },
        ];
        for spec in specs.iter() {
            for _ in 0..20 {
                let mut entries = sample();
                entries.shuffle(&mut rng);

                let once = sort(entries, spec);
                let twice = sort(once.clone(), spec);

                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_folders_form_contiguous_block_at_top() {
        let mut rng = rand::rng();
        let mut entries = sample();
        entries.shuffle(&mut rng);
        entries.push(ResourceDescriptor::parent_placeholder("/d/"));

        let sorted = sort(entries, &SortSpec::default());

        let last_folder = sorted
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, d)| d.is_folder())
            .map(|(i, _)| i)
            .max()
            .unwrap();
        let first_file = sorted.iter().position(|d| !d.is_folder()).unwrap();
        assert!(last_folder < first_file);
        assert!(sorted[0].is_placeholder());
    }

    #[test]
    fn test_toggled_flips_order_on_same_field() {
        let spec = SortSpec::default();
        let flipped = spec.toggled(SortField::Name);
        assert_eq!(flipped.order, SortOrder::Desc);
        let other = flipped.toggled(SortField::Size);
        assert_eq!(other.field, SortField::Size);
        assert_eq!(other.order, SortOrder::Asc);
    }
}
