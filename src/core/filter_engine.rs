/*
 * Per-entry visibility. Two independent signals are computed: whether a file
 * is hidden by the active extension filter, and whether an entry is hidden by
 * the live search term. Folders and the parent placeholder are never hidden by
 * the type filter; the placeholder is never hidden by search either.
 *
 * The module also holds the search debouncer: each keystroke restarts the
 * delay and the term is only applied once typing pauses.
 */
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::core::config::ExplorerConfig;
use crate::core::models::{ComputedView, ResourceDescriptor};
use crate::core::path_model;

/*
 * Computes `(hidden_by_type, hidden_by_search)` for a descriptor. An empty
 * search term never hides anything; `filter_extensions` of `None` means no
 * type filter is active.
 */
pub fn compute_visibility(
    descriptor: &ResourceDescriptor,
    filter_extensions: Option<&HashSet<String>>,
    search_term: &str,
    case_sensitive: bool,
) -> (bool, bool) {
    if descriptor.is_placeholder() {
        return (false, false);
    }
    (
        hidden_by_type(descriptor, filter_extensions),
        hidden_by_search(descriptor, search_term, case_sensitive),
    )
}

fn hidden_by_type(descriptor: &ResourceDescriptor, filter: Option<&HashSet<String>>) -> bool {
    let Some(allowed) = filter else {
        return false;
    };
    if descriptor.is_folder() {
        return false;
    }
    match path_model::extension(descriptor.name()) {
        Some(ext) => !allowed.contains(&ext),
        None => true,
    }
}

fn hidden_by_search(descriptor: &ResourceDescriptor, term: &str, case_sensitive: bool) -> bool {
    if term.is_empty() || descriptor.is_placeholder() {
        return false;
    }
    if case_sensitive {
        !descriptor.name().starts_with(term)
    } else {
        !descriptor
            .name()
            .to_lowercase()
            .starts_with(&term.to_lowercase())
    }
}

pub struct FilterEngine {
    filters: HashMap<String, HashSet<String>>,
    active_name: Option<String>,
    search_term: String,
    search_case_sensitive: bool,
}

impl FilterEngine {
    pub fn new(config: &ExplorerConfig) -> Self {
        let filters = config
            .filters
            .iter()
            .map(|(name, exts)| {
                let set = exts
                    .iter()
                    .map(|e| e.trim_start_matches('.').to_lowercase())
                    .collect::<HashSet<_>>();
                (name.clone(), set)
            })
            .collect();
        FilterEngine {
            filters,
            active_name: None,
            search_term: String::new(),
            search_case_sensitive: config.search.case_sensitive,
        }
    }

    /*
     * Activates the named extension filter. `None` or a name that is not in the
     * configuration clears the filter. Returns true if the active filter changed.
     */
    pub fn set_filter(&mut self, name: Option<&str>) -> bool {
        let next = match name {
            Some(n) if self.filters.contains_key(n) => Some(n.to_string()),
            Some(n) => {
                log::debug!("FilterEngine: Unknown filter '{n}', clearing type filter.");
                None
            }
            None => None,
        };
        let changed = next != self.active_name;
        self.active_name = next;
        changed
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.active_name.as_deref()
    }

    fn active_extensions(&self) -> Option<&HashSet<String>> {
        self.active_name
            .as_ref()
            .and_then(|name| self.filters.get(name))
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    // Updates only the type-filter flag of `computed`.
    pub fn apply_type_filter(&self, descriptor: &ResourceDescriptor, computed: &mut ComputedView) {
        computed.hidden_by_type_filter =
            !descriptor.is_placeholder() && hidden_by_type(descriptor, self.active_extensions());
    }

    // Updates only the search flag of `computed`.
    pub fn apply_search(&self, descriptor: &ResourceDescriptor, computed: &mut ComputedView) {
        computed.hidden_by_search =
            hidden_by_search(descriptor, &self.search_term, self.search_case_sensitive);
    }

    pub fn apply_all(&self, descriptor: &ResourceDescriptor, computed: &mut ComputedView) {
        let (by_type, by_search) = compute_visibility(
            descriptor,
            self.active_extensions(),
            &self.search_term,
            self.search_case_sensitive,
        );
        computed.hidden_by_type_filter = by_type;
        computed.hidden_by_search = by_search;
    }
}

/*
 * Cancel-and-restart debounce for the search box. There is no maximum wait:
 * as long as input keeps arriving faster than `delay`, nothing fires.
 */
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        SearchDebouncer {
            delay,
            pending: None,
        }
    }

    pub fn input(&mut self, term: &str, now: Instant) {
        self.pending = Some((term.to_string(), now + self.delay));
    }

    // Returns the pending term once its deadline has passed, at most once.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(term, _)| term),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ExplorerConfig;

    fn config_with_images() -> ExplorerConfig {
        let mut config = ExplorerConfig::default();
        config.filters.insert(
            "images".to_string(),
            vec!["jpg".to_string(), ".PNG".to_string()],
        );
        config
    }

    fn entries() -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::parent_placeholder("/d/"),
            ResourceDescriptor::folder("/d/pics/", 0),
            ResourceDescriptor::file("/d/cat.png", 1, 0),
            ResourceDescriptor::file("/d/notes.txt", 1, 0),
            ResourceDescriptor::file("/d/README", 1, 0),
        ]
    }

    fn visible_names(engine: &FilterEngine) -> Vec<String> {
        entries()
            .into_iter()
            .filter_map(|d| {
                let mut c = ComputedView::derive(&d);
                engine.apply_all(&d, &mut c);
                c.is_visible().then(|| d.name().to_string())
            })
            .collect()
    }

    #[test]
    fn test_type_filter_hides_other_files_only() {
        // Arrange
        let mut engine = FilterEngine::new(&config_with_images());

        // Act
        assert!(engine.set_filter(Some("images")));

        // Assert
        assert_eq!(visible_names(&engine), vec!["..", "pics", "cat.png"]);
    }

    #[test]
    fn test_unknown_filter_clears() {
        let mut engine = FilterEngine::new(&config_with_images());
        engine.set_filter(Some("images"));

        assert!(engine.set_filter(Some("nope")));
        assert!(engine.active_filter().is_none());
        assert_eq!(visible_names(&engine).len(), 5);
        assert!(!engine.set_filter(None));
    }

    #[test]
    fn test_search_is_prefix_and_case_insensitive() {
        let mut engine = FilterEngine::new(&ExplorerConfig::default());
        engine.set_search_term("NO");

        assert_eq!(visible_names(&engine), vec!["..", "notes.txt"]);
    }

    #[test]
    fn test_case_sensitive_search() {
        let mut config = ExplorerConfig::default();
        config.search.case_sensitive = true;
        let mut engine = FilterEngine::new(&config);
        engine.set_search_term("RE");

        assert_eq!(visible_names(&engine), vec!["..", "README"]);
    }

    #[test]
    fn test_clearing_search_restores_type_filter_state() {
        // Arrange
        let mut engine = FilterEngine::new(&config_with_images());
        engine.set_filter(Some("images"));
        let baseline = visible_names(&engine);

        // Act
        engine.set_search_term("zzz");
        assert_eq!(visible_names(&engine), vec![".."]);
        engine.set_search_term("");

        // Assert
        assert_eq!(visible_names(&engine), baseline);
    }

    #[test]
    fn test_independent_flag_updates() {
        let mut engine = FilterEngine::new(&config_with_images());
        let d = ResourceDescriptor::file("/d/notes.txt", 1, 0);
        let mut c = ComputedView::derive(&d);

        engine.set_search_term("x");
        engine.apply_search(&d, &mut c);
        assert!(c.hidden_by_search);
        assert!(!c.hidden_by_type_filter);

        engine.set_filter(Some("images"));
        engine.apply_type_filter(&d, &mut c);
        assert!(c.hidden_by_type_filter);
        assert!(c.hidden_by_search);
    }

    #[test]
    fn test_free_compute_visibility() {
        let exts: HashSet<String> = ["txt".to_string()].into_iter().collect();
        let d = ResourceDescriptor::file("/d/a.png", 1, 0);
        assert_eq!(compute_visibility(&d, Some(&exts), "", false), (true, false));
        assert_eq!(compute_visibility(&d, None, "b", false), (false, true));
        let p = ResourceDescriptor::parent_placeholder("/d/");
        assert_eq!(compute_visibility(&p, Some(&exts), "b", false), (false, false));
    }

    #[test]
    fn test_debouncer_restarts_on_each_input() {
        // Arrange
        let start = Instant::now();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(500));

        // Act
        debouncer.input("a", start);
        debouncer.input("ab", start + Duration::from_millis(400));

        // Assert
        assert!(debouncer.poll(start + Duration::from_millis(600)).is_none());
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(900)).as_deref(),
            Some("ab")
        );
        assert!(debouncer.poll(start + Duration::from_millis(2000)).is_none());
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_debouncer_cancel() {
        let start = Instant::now();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(10));
        debouncer.input("a", start);
        debouncer.cancel();
        assert!(debouncer.poll(start + Duration::from_secs(1)).is_none());
    }
}
