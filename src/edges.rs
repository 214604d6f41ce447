use crate::model::Edge;

/// Internal trigger sentinels; never matched as an explicit handle name (§4.5).
pub const TRIGGER_START_FLOW: &str = "_internal_start_flow_";
pub const TRIGGER_TRANSITION: &str = "_internal_transition_";
pub const TRIGGER_ERROR: &str = "_internal_error_";

const DEFAULT_HANDLES: [&str; 4] = ["source", "source-bottom", "source-default", "source-success"];

pub fn is_internal(trigger: &str) -> bool {
    matches!(trigger, TRIGGER_START_FLOW | TRIGGER_TRANSITION | TRIGGER_ERROR)
}

pub fn is_external(trigger: &str) -> bool {
    !is_internal(trigger)
}

/// Resolve the outgoing edge to follow from `edges` (a node's outgoing
/// edges, in declaration order) given the current `trigger` and whether the
/// source node is a `waitInput` node receiving external input.
///
/// Priority order is documented in §4.5; `condition` nodes never call this
/// (they resolve directly by `source-true`/`source-false`).
pub fn next_edge<'a>(edges: &'a [Edge], trigger: Option<&str>, is_wait_input_external: bool) -> Option<&'a Edge> {
    if let Some(trigger) = trigger {
        if !is_internal(trigger) {
            if let Some(edge) = edges.iter().find(|e| e.source_handle.as_deref() == Some(trigger)) {
                return Some(edge);
            }
        }
    }

    if is_wait_input_external {
        if let Some(edge) = edges.iter().find(|e| e.source_handle.as_deref() == Some("source-received")) {
            return Some(edge);
        }
    }

    if trigger == Some(TRIGGER_ERROR) {
        if let Some(edge) = edges.iter().find(|e| e.source_handle.as_deref() == Some("source-error")) {
            return Some(edge);
        }
    }

    let defaults: Vec<&Edge> = edges
        .iter()
        .filter(|e| match e.source_handle.as_deref() {
            None | Some("") => true,
            Some(handle) => DEFAULT_HANDLES.contains(&handle),
        })
        .collect();
    if defaults.len() > 1 {
        tracing::warn!(count = defaults.len(), "multiple default edges from one node; taking the first");
    }
    defaults.into_iter().next()
}

/// Pick the edge for a resolved `condition` node outcome by the literal
/// `source-true` / `source-false` handle.
pub fn condition_edge(edges: &[Edge], outcome: bool) -> Option<&Edge> {
    let handle = if outcome { "source-true" } else { "source-false" };
    let picked = edges.iter().find(|e| e.source_handle.as_deref() == Some(handle));
    if picked.is_none() {
        tracing::warn!(handle, "condition node has no edge for this outcome");
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source_handle: Option<&str>, target: &str) -> Edge {
        Edge {
            source: "n1".to_string(),
            target: target.to_string(),
            source_handle: source_handle.map(str::to_string),
        }
    }

    #[test]
    fn explicit_handle_wins_over_default() {
        let edges = vec![edge(Some("go"), "b"), edge(None, "a")];
        let picked = next_edge(&edges, Some("go"), false);
        assert_eq!(picked.unwrap().target, "b");
    }

    #[test]
    fn internal_trigger_never_matches_a_handle_literally() {
        let edges = vec![edge(Some(TRIGGER_START_FLOW), "wrong"), edge(None, "default")];
        let picked = next_edge(&edges, Some(TRIGGER_START_FLOW), false);
        assert_eq!(picked.unwrap().target, "default");
    }

    #[test]
    fn wait_input_external_uses_source_received() {
        let edges = vec![edge(Some("source-received"), "next")];
        let picked = next_edge(&edges, Some("user said hi"), true);
        assert_eq!(picked.unwrap().target, "next");
    }

    #[test]
    fn error_trigger_uses_source_error() {
        let edges = vec![edge(Some("source-error"), "err"), edge(None, "default")];
        let picked = next_edge(&edges, Some(TRIGGER_ERROR), false);
        assert_eq!(picked.unwrap().target, "err");
    }

    #[test]
    fn first_default_wins_on_tie() {
        let edges = vec![edge(Some("source"), "first"), edge(Some("source-default"), "second")];
        let picked = next_edge(&edges, Some(TRIGGER_TRANSITION), false);
        assert_eq!(picked.unwrap().target, "first");
    }

    #[test]
    fn no_match_returns_none() {
        let edges = vec![edge(Some("custom"), "x")];
        assert!(next_edge(&edges, Some(TRIGGER_TRANSITION), false).is_none());
    }

    #[test]
    fn condition_edge_picks_true_or_false_handle() {
        let edges = vec![edge(Some("source-true"), "yes"), edge(Some("source-false"), "no")];
        assert_eq!(condition_edge(&edges, true).unwrap().target, "yes");
        assert_eq!(condition_edge(&edges, false).unwrap().target, "no");
    }
}
