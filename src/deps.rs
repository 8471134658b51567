//! Link records to dependency edges.
//!
//! Endpoints are not checked against the task list; the chart simply skips
//! edges whose ends it does not know.

use crate::fields::DependencyKind;
use crate::task::{LinkRecord, NormalizedDependency, RawLinkType};

pub fn map_dependency(link: &LinkRecord) -> NormalizedDependency {
    NormalizedDependency {
        id: link.id.clone(),
        from: link.source.clone(),
        to: link.target.clone(),
        kind: resolve_kind(link),
    }
}

pub fn map_dependencies(links: &[LinkRecord]) -> Vec<NormalizedDependency> {
    links.iter().map(map_dependency).collect()
}

fn resolve_kind(link: &LinkRecord) -> DependencyKind {
    match &link.kind {
        None => DependencyKind::FinishToStart,
        Some(RawLinkType::Code(c)) => DependencyKind::from_code(*c),
        Some(RawLinkType::Name(s)) if s.trim().is_empty() => DependencyKind::FinishToStart,
        Some(RawLinkType::Name(s)) => {
            if let Some(kind) = DependencyKind::from_short_name(s) {
                kind
            } else if let Ok(code) = s.trim().parse::<i64>() {
                DependencyKind::from_code(code)
            } else {
                log::warn!(
                    "link {} -> {}: unknown dependency type {s:?}, using finish-to-start",
                    link.source,
                    link.target
                );
                DependencyKind::FinishToStart
            }
        }
    }
}
