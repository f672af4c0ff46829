use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    models::{Comment, CommentNode, CommentSort},
    services::ranking::compare_comments,
};

/// Nest a flat comment list into a reply forest.
///
/// Children keep their input order. A comment whose parent is missing, is on
/// another post, or would close a cycle becomes a root instead. Deleted
/// comments stay in place so their replies remain nested under them.
pub fn build_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let len = comments.len();

    let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(len);
    for (i, comment) in comments.iter().enumerate() {
        index.entry(comment.id).or_insert(i);
    }

    let mut parent_of: Vec<Option<usize>> = vec![None; len];
    for (i, comment) in comments.iter().enumerate() {
        let Some(parent_id) = comment.parent_id else {
            continue;
        };

        match index.get(&parent_id) {
            Some(&p) if p != i && comments[p].post_id == comment.post_id => {
                parent_of[i] = Some(p);
            }
            _ => {
                tracing::warn!(
                    "Comment {} references unknown parent {}, attaching at root",
                    comment.id,
                    parent_id
                );
            }
        }
    }

    break_cycles(&comments, &mut parent_of);

    let children = child_lists(&parent_of);
    let roots: Vec<usize> = (0..len).filter(|&i| parent_of[i].is_none()).collect();

    let mut slots: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let forest = materialize(&roots, &children, &mut slots);

    tracing::debug!("Built comment tree: {} nodes, {} roots", len, forest.len());
    forest
}

/// Order every level of the forest with the same comparator.
pub fn sort_tree(mut forest: Vec<CommentNode>, sort: CommentSort) -> Vec<CommentNode> {
    let mut pending: Vec<&mut Vec<CommentNode>> = vec![&mut forest];
    while let Some(level) = pending.pop() {
        level.sort_by(|a, b| compare_comments(&a.comment, &b.comment, sort));
        for node in level {
            pending.push(&mut node.replies);
        }
    }
    forest
}

// Detach one comment per reply cycle: the first one a walk up `parent_of`
// revisits.
fn break_cycles(comments: &[Comment], parent_of: &mut [Option<usize>]) {
    const UNSEEN: usize = usize::MAX;
    let mut walk_of = vec![UNSEEN; parent_of.len()];
    let mut settled = vec![false; parent_of.len()];

    for start in 0..parent_of.len() {
        let mut path = Vec::new();
        let mut current = start;
        loop {
            if settled[current] {
                break;
            }
            if walk_of[current] == start {
                tracing::warn!(
                    "Comment {} is part of a reply cycle, attaching at root",
                    comments[current].id
                );
                parent_of[current] = None;
                break;
            }
            walk_of[current] = start;
            path.push(current);
            match parent_of[current] {
                Some(p) => current = p,
                None => break,
            }
        }
        for i in path {
            settled[i] = true;
        }
    }
}

fn child_lists(parent_of: &[Option<usize>]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); parent_of.len()];
    for (i, parent) in parent_of.iter().enumerate() {
        if let Some(p) = parent {
            children[*p].push(i);
        }
    }
    children
}

// Children are built before their parents by walking a pre-order in reverse.
fn materialize(
    roots: &[usize],
    children: &[Vec<usize>],
    slots: &mut [Option<Comment>],
) -> Vec<CommentNode> {
    let mut order = Vec::with_capacity(slots.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev().copied());
    }

    let mut built: Vec<Option<CommentNode>> = (0..slots.len()).map(|_| None).collect();
    for &i in order.iter().rev() {
        let Some(comment) = slots[i].take() else {
            continue;
        };
        let replies = children[i]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[i] = Some(CommentNode { comment, replies });
    }

    roots.iter().filter_map(|&root| built[root].take()).collect()
}
