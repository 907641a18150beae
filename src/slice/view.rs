//! Selections over nested struct arrays

use std::fmt;

use super::errors::{SliceError, SliceResult};
use super::spec::SliceSpec;
use crate::tree::{Node, StructArray, Value};

/// One entry of a selection: a tree node, or the nodes one struct array
/// contributed to an array-wise range
#[derive(Debug, Clone)]
pub enum Selection {
    Item(Node),
    Group(Vec<Selection>),
}

impl Selection {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Selection::Item(node) => Some(node),
            Selection::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&[Selection]> {
        match self {
            Selection::Item(_) => None,
            Selection::Group(group) => Some(group),
        }
    }
}

/// An unwrapped selected element
#[derive(Debug, Clone)]
pub enum Item {
    /// Value of a selected leaf
    Value(Value),
    /// A selected structure or struct array
    Node(Node),
    /// Elements below the last regular nesting level of a ragged selection
    List(Vec<Item>),
}

impl Item {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Value(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn of(node: &Node) -> SliceResult<Item> {
        Ok(match node {
            Node::Leaf(leaf) => Item::Value(leaf.value()?),
            other => Item::Node(other.clone()),
        })
    }
}

/// A selection of tree nodes addressed through struct array indices.
///
/// Indexing a view whose nodes are struct arrays applies to each array
/// separately ("array-wise"): an integer picks one element per array, a
/// range keeps one group per array. Otherwise indexing picks among the
/// selected nodes in order. Groups only matter to [`SliceView::shape`],
/// [`SliceView::flatten`] and dense conversion; length and iteration see
/// the flat run of nodes.
#[derive(Clone)]
pub struct SliceView {
    path: String,
    entries: Vec<Selection>,
}

impl SliceView {
    /// Elements `spec` selects from `array`
    pub fn new(array: &StructArray, spec: impl Into<SliceSpec>) -> SliceResult<Self> {
        let spec = spec.into();
        let elements = array.elements()?;
        let entries = spec
            .indices(elements.len())?
            .into_iter()
            .map(|i| Selection::Item(Node::Structure(elements[i].clone())))
            .collect();
        Ok(Self {
            path: format!("{}{}", array.path(), spec),
            entries,
        })
    }

    /// Path expression that produced this view, e.g. `profiles_1d[1:4]/ion`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of selected nodes, across all groups
    pub fn len(&self) -> usize {
        count_nodes(&self.entries)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> &[Selection] {
        &self.entries
    }

    /// Selected nodes in order, across all groups
    pub fn nodes(&self) -> Vec<Node> {
        let mut out = Vec::new();
        collect_nodes(&self.entries, &mut out);
        out
    }

    /// True when every selected node is a struct array
    pub fn is_array_wise(&self) -> bool {
        let nodes = self.nodes();
        !nodes.is_empty() && nodes.iter().all(|n| matches!(n, Node::StructArray(_)))
    }

    /// Selected node `index`; negative counts from the end
    pub fn get(&self, index: isize) -> SliceResult<Node> {
        let mut nodes = self.nodes();
        let len = nodes.len();
        let position = resolve(index, len).ok_or_else(|| SliceError::IndexOutOfRange {
            path: self.path.clone(),
            index,
            len,
        })?;
        Ok(nodes.swap_remove(position))
    }

    /// Element `index` of every selected struct array.
    ///
    /// An array too short for `index` fails the whole call with an error
    /// naming that array.
    pub fn index(&self, index: isize) -> SliceResult<SliceView> {
        if !self.is_array_wise() {
            return Err(SliceError::NotArrayWise(self.path.clone()));
        }
        let entries = map_items(&self.entries, &mut |node| {
            let array = expect_array(node)?;
            let len = array.len()?;
            let position = resolve(index, len).ok_or_else(|| SliceError::IndexOutOfRange {
                path: array.path(),
                index,
                len,
            })?;
            Ok(Selection::Item(Node::Structure(array.get(position)?)))
        })?;
        Ok(SliceView {
            path: format!("{}[{}]", self.path, index),
            entries,
        })
    }

    /// Applies `spec` to every selected struct array, or else to the
    /// selected nodes
    pub fn slice(&self, spec: impl Into<SliceSpec>) -> SliceResult<SliceView> {
        let spec = spec.into();
        let entries = if self.is_array_wise() {
            map_items(&self.entries, &mut |node| {
                let elements = expect_array(node)?.elements()?;
                let group = spec
                    .indices(elements.len())?
                    .into_iter()
                    .map(|i| Selection::Item(Node::Structure(elements[i].clone())))
                    .collect();
                Ok(Selection::Group(group))
            })?
        } else {
            let nodes = self.nodes();
            spec.indices(nodes.len())?
                .into_iter()
                .map(|i| Selection::Item(nodes[i].clone()))
                .collect()
        };
        Ok(SliceView {
            path: format!("{}{}", self.path, spec),
            entries,
        })
    }

    /// Child `name` of every selected structure
    pub fn child(&self, name: &str) -> SliceResult<SliceView> {
        if self.is_empty() {
            return Err(SliceError::Empty {
                path: self.path.clone(),
                name: name.to_string(),
            });
        }
        let entries = map_items(&self.entries, &mut |node| Ok(Selection::Item(node.child(name)?)))?;
        Ok(SliceView {
            path: format!("{}/{}", self.path, name),
            entries,
        })
    }

    /// Merges the top-level groups into one flat run of entries
    pub fn flatten(&self) -> SliceView {
        let mut entries = Vec::new();
        for entry in &self.entries {
            match entry {
                Selection::Group(group) => entries.extend(group.iter().cloned()),
                item => entries.push(item.clone()),
            }
        }
        SliceView {
            path: self.path.clone(),
            entries,
        }
    }

    /// Size at each nesting level, followed by the axes of the selected
    /// leaf values when they all share one shape. `None` when the groups
    /// are ragged.
    pub fn shape(&self) -> SliceResult<Option<Vec<usize>>> {
        let (mut dims, cells) = regular_prefix(&self.entries);
        if cells.iter().any(|cell| cell.as_node().is_none()) {
            return Ok(None);
        }

        let mut common: Option<Vec<usize>> = None;
        for cell in &cells {
            let Some(Node::Leaf(leaf)) = cell.as_node() else {
                return Ok(Some(dims));
            };
            let shape = leaf.with_value(Value::shape)?;
            match &common {
                Some(seen) if *seen != shape => return Ok(Some(dims)),
                Some(_) => {}
                None => common = Some(shape),
            }
        }
        dims.extend(common.unwrap_or_default());
        Ok(Some(dims))
    }

    /// Leaf values and non-leaf nodes, flattened in order
    pub fn values(&self) -> SliceResult<Vec<Item>> {
        self.nodes().iter().map(Item::of).collect()
    }

    pub(crate) fn regular_cells(&self) -> (Vec<usize>, Vec<&Selection>) {
        regular_prefix(&self.entries)
    }
}

impl fmt::Display for SliceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.len();
        write!(
            f,
            "<SliceView ({} with {} item{})>",
            self.path,
            n,
            if n == 1 { "" } else { "s" }
        )
    }
}

impl fmt::Debug for SliceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl StructArray {
    /// View over the elements `spec` selects
    pub fn slice(&self, spec: impl Into<SliceSpec>) -> SliceResult<SliceView> {
        SliceView::new(self, spec)
    }
}

fn resolve(index: isize, len: usize) -> Option<usize> {
    let position = if index < 0 {
        index + len as isize
    } else {
        index
    };
    (0..len as isize).contains(&position).then_some(position as usize)
}

fn expect_array(node: &Node) -> SliceResult<&StructArray> {
    node.as_struct_array()
        .ok_or_else(|| SliceError::NotArrayWise(node.path()))
}

fn count_nodes(entries: &[Selection]) -> usize {
    entries
        .iter()
        .map(|entry| match entry {
            Selection::Item(_) => 1,
            Selection::Group(group) => count_nodes(group),
        })
        .sum()
}

fn collect_nodes(entries: &[Selection], out: &mut Vec<Node>) {
    for entry in entries {
        match entry {
            Selection::Item(node) => out.push(node.clone()),
            Selection::Group(group) => collect_nodes(group, out),
        }
    }
}

fn map_items<F>(entries: &[Selection], f: &mut F) -> SliceResult<Vec<Selection>>
where
    F: FnMut(&Node) -> SliceResult<Selection>,
{
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        out.push(match entry {
            Selection::Item(node) => f(node)?,
            Selection::Group(group) => Selection::Group(map_items(group, f)?),
        });
    }
    Ok(out)
}

/// Longest run of equal-sized nesting levels, and the cells below it in
/// row-major order
fn regular_prefix(entries: &[Selection]) -> (Vec<usize>, Vec<&Selection>) {
    let mut dims = vec![entries.len()];
    let mut level: Vec<&Selection> = entries.iter().collect();
    loop {
        let widths: Option<Vec<usize>> = level
            .iter()
            .map(|entry| entry.as_group().map(<[Selection]>::len))
            .collect();
        let width = match widths.as_deref() {
            Some([first, rest @ ..]) if rest.iter().all(|w| w == first) => *first,
            _ => return (dims, level),
        };
        dims.push(width);
        level = level
            .iter()
            .copied()
            .filter_map(Selection::as_group)
            .flatten()
            .collect();
    }
}
