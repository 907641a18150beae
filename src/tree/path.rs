//! Path strings such as `profiles_1d[1]/ion[0]/label`

use super::errors::{TreeError, TreeResult};
use super::node::Node;

/// One `/`-separated component, optionally indexing a struct array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub name: &'a str,
    pub index: Option<usize>,
}

pub(crate) fn parse(path: &str) -> TreeResult<Vec<Segment<'_>>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed.split('/').map(|s| parse_segment(path, s)).collect()
}

fn parse_segment<'a>(full: &str, segment: &'a str) -> TreeResult<Segment<'a>> {
    let invalid = |reason: &str| TreeError::InvalidPath(full.to_string(), reason.to_string());

    let (name, index) = match segment.find('[') {
        None => (segment, None),
        Some(open) => {
            let inner = segment[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| invalid("unterminated index"))?;
            let index = inner
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid("index is not a non-negative integer"))?;
            (&segment[..open], Some(index))
        }
    };

    if name.is_empty() {
        return Err(invalid("empty component"));
    }
    if name.contains(']') {
        return Err(invalid("unbalanced ']'"));
    }
    Ok(Segment { name, index })
}

/// Walks `path` down from `start`
pub(crate) fn navigate(start: Node, path: &str) -> TreeResult<Node> {
    let mut node = start;
    for segment in parse(path)? {
        node = node.child(segment.name)?;
        if let Some(index) = segment.index {
            node = Node::Structure(node.into_struct_array()?.get(index)?);
        }
    }
    Ok(node)
}

pub(crate) fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Strips element indices: `a[1]/b[0]/c` becomes `a/b/c`
pub fn schema_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_index = false;
    for c in path.chars() {
        match c {
            '[' => in_index = true,
            ']' => in_index = false,
            c if !in_index => out.push(c),
            _ => {}
        }
    }
    out
}
