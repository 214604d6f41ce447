use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::model::Flow;

/// Holds the currently loaded [`Flow`], swapped atomically on reload.
///
/// Readers (`current()`) never observe a half-updated flow: `ArcSwapOption`
/// publishes a new `Arc<Flow>` with a single atomic store, and a request in
/// flight when a reload happens simply keeps the `Arc` it already loaded.
#[derive(Default)]
pub struct FlowRegistry {
    current: ArcSwapOption<Flow>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    pub fn current(&self) -> Option<Arc<Flow>> {
        self.current.load_full()
    }

    /// Replace the current flow, returning the previous flow's id (if any)
    /// so the caller can decide whether to purge sessions (§4.9).
    pub fn replace(&self, new_flow: Flow) -> Option<String> {
        let previous = self.current.swap(Some(Arc::new(new_flow)));
        previous.map(|flow| flow.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn flow(id: &str) -> Flow {
        Flow {
            id: id.to_string(),
            name: "test".to_string(),
            nodes: HashMap::new(),
            edges: Vec::new(),
            start_node_id: "start".to_string(),
        }
    }

    #[test]
    fn starts_empty() {
        let registry = FlowRegistry::new();
        assert!(registry.current().is_none());
    }

    #[test]
    fn replace_reports_the_previous_id() {
        let registry = FlowRegistry::new();
        assert_eq!(registry.replace(flow("a")), None);
        assert_eq!(registry.replace(flow("b")), Some("a".to_string()));
        assert_eq!(registry.current().unwrap().id, "b");
    }
}
