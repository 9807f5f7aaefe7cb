//! Read-only list presentation: visibility sections and folder buckets.
//! Recomputed from the latest snapshot on every request; nothing is cached.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::visibility::Visibility;

/// Bucket items by folder label. Items keep their input order inside each
/// bucket; the no-folder bucket (labelled `root_label`) always leads and
/// the remaining buckets sort case-insensitively by label.
pub fn group_by_folder<T, F>(items: Vec<T>, root_label: &str, label_of: F) -> Vec<(String, Vec<T>)>
where
    F: Fn(&T) -> Option<String>,
{
    let mut buckets: Vec<(String, Vec<T>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let label = match label_of(&item) {
            Some(label) if !label.is_empty() => label,
            _ => root_label.to_string(),
        };
        let slot = *index.entry(label.clone()).or_insert_with(|| {
            buckets.push((label, Vec::new()));
            buckets.len() - 1
        });
        buckets[slot].1.push(item);
    }

    buckets.sort_by(|a, b| label_order(&a.0, &b.0, root_label));
    buckets
}

fn label_order(a: &str, b: &str, root_label: &str) -> Ordering {
    match (a == root_label, b == root_label) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
    }
}

/// Items split into the three visibility sections, input order preserved.
#[derive(Clone, Debug, Default)]
pub struct Sections<T> {
    pub private: Vec<T>,
    pub shared: Vec<T>,
    pub public: Vec<T>,
}

pub fn split_sections<T, F>(items: Vec<T>, visibility_of: F) -> Sections<T>
where
    F: Fn(&T) -> Visibility,
{
    let mut sections = Sections {
        private: Vec::new(),
        shared: Vec::new(),
        public: Vec::new(),
    };
    for item in items {
        match visibility_of(&item) {
            Visibility::Private => sections.private.push(item),
            Visibility::Shared => sections.shared.push(item),
            Visibility::Public => sections.public.push(item),
        }
    }
    sections
}
