//! Flat task list to nested forest.
//!
//! Every input record yields exactly one node. A node whose parent is unknown
//! becomes a root, and parent cycles are broken before nesting so the result
//! is always a finite tree.

use std::collections::HashMap;

use crate::dates::{derive_duration, normalize_field};
use crate::error::GanttError;
use crate::task::{NormalizedTask, TaskId, TaskRecord};

/// Project a single record into the chart's shape, without children or parent.
///
/// Name falls back from `name` to `text` to `"Task {id}"`; progress defaults to
/// zero and is clamped to 0..=100.
pub fn project_task(record: &TaskRecord) -> NormalizedTask {
    let name = [record.name.as_deref(), record.text.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Task {}", record.id));

    let start_date = normalize_field(&record.id, "start", record.start.as_ref());
    let end_date = normalize_field(&record.id, "end", record.end.as_ref());
    let deadline = normalize_field(&record.id, "deadline", record.deadline.as_ref());

    NormalizedTask {
        id: record.id.clone(),
        name,
        start_date,
        end_date,
        deadline,
        duration: derive_duration(start_date, end_date, record.duration),
        percent_done: clamp_percent(record.progress.unwrap_or(0.0)),
        parent_id: None,
        expanded: record.open,
        kind: record.kind.clone(),
        children: None,
    }
}

fn clamp_percent(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 100.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Fresh,
    OnPath,
    Done,
}

/// Build the forest of roots from a flat, ordered list of records.
///
/// Roots and siblings keep their relative input order.
pub fn build_hierarchy(records: &[TaskRecord]) -> Vec<NormalizedTask> {
    let mut nodes: Vec<Option<NormalizedTask>> = records.iter().map(|r| Some(project_task(r))).collect();

    // First occurrence of an id is the one children attach to.
    let mut index: HashMap<&TaskId, usize> = HashMap::with_capacity(records.len());
    for (i, r) in records.iter().enumerate() {
        if index.contains_key(&r.id) {
            log::warn!("duplicate task id {}; children attach to the first occurrence", r.id);
        } else {
            index.insert(&r.id, i);
        }
    }

    let mut parent_of: Vec<Option<usize>> = records
        .iter()
        .map(|r| {
            let p = r.parent.as_ref()?;
            match index.get(p) {
                Some(&i) => Some(i),
                None => {
                    log::warn!("task {}: parent {} not found, promoting to root", r.id, p);
                    None
                }
            }
        })
        .collect();

    break_cycles(records, &mut parent_of);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots = Vec::new();
    for (i, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
        if let Some(node) = nodes[i].as_mut() {
            node.parent_id = parent.map(|p| records[p].id.clone());
        }
    }

    roots
        .into_iter()
        .filter_map(|i| assemble(i, &mut nodes, &children))
        .collect()
}

/// Detach one edge from every parent cycle. The cycle member that comes first
/// in input order loses its parent and becomes a root.
fn break_cycles(records: &[TaskRecord], parent_of: &mut [Option<usize>]) {
    let mut state = vec![Visit::Fresh; parent_of.len()];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..parent_of.len() {
        let mut cur = Some(start);
        while let Some(c) = cur {
            match state[c] {
                Visit::Done => break,
                Visit::OnPath => {
                    let at = path.iter().position(|&n| n == c).unwrap_or(0);
                    if let Some(&breaker) = path[at..].iter().min() {
                        let err = GanttError::CyclicHierarchy(format!(
                            "task {} is its own ancestor",
                            records[breaker].id
                        ));
                        log::warn!("{err}; promoting it to root");
                        parent_of[breaker] = None;
                    }
                    break;
                }
                Visit::Fresh => {
                    state[c] = Visit::OnPath;
                    path.push(c);
                    cur = parent_of[c];
                }
            }
        }
        for n in path.drain(..) {
            state[n] = Visit::Done;
        }
    }
}

fn assemble(i: usize, nodes: &mut [Option<NormalizedTask>], children: &[Vec<usize>]) -> Option<NormalizedTask> {
    let mut node = nodes[i].take()?;
    if !children[i].is_empty() {
        let kids: Vec<NormalizedTask> = children[i]
            .iter()
            .filter_map(|&c| assemble(c, nodes, children))
            .collect();
        node.children = Some(kids);
    }
    Some(node)
}

/// Pre-order flattening of a forest. Each task keeps its `parent_id` and
/// loses its `children`.
pub fn flatten(roots: &[NormalizedTask]) -> Vec<NormalizedTask> {
    let mut out = Vec::new();
    for root in roots {
        flatten_into(root, &mut out);
    }
    out
}

fn flatten_into(node: &NormalizedTask, out: &mut Vec<NormalizedTask>) {
    out.push(NormalizedTask { children: None, ..node.clone() });
    for child in node.children.iter().flatten() {
        flatten_into(child, out);
    }
}

/// Pre-order walk yielding each node with its depth (roots are depth 0).
pub fn walk_with_depth(roots: &[NormalizedTask]) -> Vec<(usize, &NormalizedTask)> {
    fn visit<'a>(node: &'a NormalizedTask, depth: usize, out: &mut Vec<(usize, &'a NormalizedTask)>) {
        out.push((depth, node));
        for child in node.children.iter().flatten() {
            visit(child, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    for root in roots {
        visit(root, 0, &mut out);
    }
    out
}

/// Number of nodes reachable from the given roots.
pub fn count_nodes(roots: &[NormalizedTask]) -> usize {
    roots
        .iter()
        .map(|n| 1 + n.children.as_deref().map_or(0, count_nodes))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::RawDate;

    fn rec(id: i64, parent: Option<i64>) -> TaskRecord {
        let mut r = TaskRecord::new(id);
        r.parent = parent.map(TaskId::Num);
        r
    }

    fn ids(nodes: &[NormalizedTask]) -> Vec<TaskId> {
        nodes.iter().map(|n| n.id.clone()).collect()
    }

    fn child_ids(node: &NormalizedTask) -> Vec<TaskId> {
        node.children.as_deref().map(ids).unwrap_or_default()
    }

    #[test]
    fn test_empty_input() {
        assert!(build_hierarchy(&[]).is_empty());
    }

    #[test]
    fn test_projection_defaults() {
        let mut r = TaskRecord::new(4);
        r.text = Some("Engine wash".into());
        let t = project_task(&r);
        assert_eq!(t.name, "Engine wash");
        assert_eq!(t.percent_done, 0.0);
        assert_eq!(t.duration, None);
        assert!(t.children.is_none());

        r.name = Some("Named".into());
        assert_eq!(project_task(&r).name, "Named");

        let bare = project_task(&TaskRecord::new(9));
        assert_eq!(bare.name, "Task 9");
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut r = TaskRecord::new(1);
        r.progress = Some(140.0);
        assert_eq!(project_task(&r).percent_done, 100.0);
        r.progress = Some(-5.0);
        assert_eq!(project_task(&r).percent_done, 0.0);
        r.progress = Some(f64::NAN);
        assert_eq!(project_task(&r).percent_done, 0.0);
    }

    #[test]
    fn test_children_nest_in_input_order() {
        let input = vec![rec(1, None), rec(3, Some(1)), rec(2, Some(1)), rec(4, Some(3)), rec(5, None)];
        let out = build_hierarchy(&input);
        assert_eq!(ids(&out), vec![TaskId::Num(1), TaskId::Num(5)]);
        assert_eq!(child_ids(&out[0]), vec![TaskId::Num(3), TaskId::Num(2)]);
        let three = &out[0].children.as_ref().unwrap()[0];
        assert_eq!(child_ids(three), vec![TaskId::Num(4)]);
        assert_eq!(three.parent_id, Some(TaskId::Num(1)));
        // Leaves carry no children list at all.
        assert!(out[1].children.is_none());
    }

    #[test]
    fn test_child_listed_before_parent() {
        let out = build_hierarchy(&[rec(2, Some(1)), rec(1, None)]);
        assert_eq!(ids(&out), vec![TaskId::Num(1)]);
        assert_eq!(child_ids(&out[0]), vec![TaskId::Num(2)]);
    }

    #[test]
    fn test_orphans_become_roots_in_place() {
        let input = vec![rec(1, None), rec(2, Some(99)), rec(3, None)];
        let out = build_hierarchy(&input);
        assert_eq!(ids(&out), vec![TaskId::Num(1), TaskId::Num(2), TaskId::Num(3)]);
        assert_eq!(out[1].parent_id, None);
    }

    #[test]
    fn test_node_count_is_conserved() {
        let input = vec![
            rec(1, None),
            rec(2, Some(1)),
            rec(3, Some(2)),
            rec(4, Some(42)),
            rec(5, Some(5)),
            rec(6, Some(7)),
            rec(7, Some(6)),
            rec(8, Some(3)),
        ];
        let out = build_hierarchy(&input);
        assert_eq!(count_nodes(&out), input.len());
        assert_eq!(flatten(&out).len(), input.len());
    }

    #[test]
    fn test_self_reference_is_promoted() {
        let out = build_hierarchy(&[rec(1, Some(1)), rec(2, Some(1))]);
        assert_eq!(ids(&out), vec![TaskId::Num(1)]);
        assert_eq!(out[0].parent_id, None);
        assert_eq!(child_ids(&out[0]), vec![TaskId::Num(2)]);
    }

    #[test]
    fn test_cycle_breaks_at_first_member() {
        // 1 -> 3 -> 2 -> 1, plus 4 hanging off 2.
        let input = vec![rec(1, Some(3)), rec(2, Some(1)), rec(3, Some(2)), rec(4, Some(2))];
        let out = build_hierarchy(&input);
        assert_eq!(ids(&out), vec![TaskId::Num(1)]);
        let two = &out[0].children.as_ref().unwrap()[0];
        assert_eq!(two.id, TaskId::Num(2));
        assert_eq!(child_ids(two), vec![TaskId::Num(3), TaskId::Num(4)]);
        assert_eq!(count_nodes(&out), 4);
    }

    #[test]
    fn test_duplicate_ids_keep_every_record() {
        let mut second = rec(1, None);
        second.name = Some("again".into());
        let out = build_hierarchy(&[rec(1, None), second, rec(2, Some(1))]);
        assert_eq!(count_nodes(&out), 3);
        assert_eq!(child_ids(&out[0]), vec![TaskId::Num(2)]);
        assert_eq!(out[1].name, "again");
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut a = rec(1, None);
        a.start = Some(RawDate::Text("2025-01-01".into()));
        let input = vec![a, rec(2, Some(1)), rec(3, Some(404))];
        assert_eq!(build_hierarchy(&input), build_hierarchy(&input));
    }

    #[test]
    fn test_flatten_is_preorder_with_parent_ids() {
        let input = vec![rec(1, None), rec(2, Some(1)), rec(3, None), rec(4, Some(2))];
        let flat = flatten(&build_hierarchy(&input));
        assert_eq!(ids(&flat), vec![TaskId::Num(1), TaskId::Num(2), TaskId::Num(4), TaskId::Num(3)]);
        assert!(flat.iter().all(|t| t.children.is_none()));
        assert_eq!(flat[2].parent_id, Some(TaskId::Num(2)));
        assert_eq!(flat[3].parent_id, None);
    }

    #[test]
    fn test_walk_with_depth() {
        let input = vec![rec(1, None), rec(2, Some(1)), rec(3, Some(2))];
        let forest = build_hierarchy(&input);
        let depths: Vec<usize> = walk_with_depth(&forest).iter().map(|(d, _)| *d).collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }
}
