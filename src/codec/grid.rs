//! Row-major index arithmetic over variable buffers
//!
//! A variable's buffer covers the full rectangular grid of its dimensions.
//! A node's value occupies the sub-block whose leading indices are the node's
//! struct array position and whose trailing extents are the value's shape.

use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;

use crate::columnar::{AttrValue, VariableData};
use crate::schema::DataKind;
use crate::tree::Value;

/// Flat offset of `index` in a grid of `shape`; `None` when out of bounds
pub(crate) fn ravel(index: &[usize], shape: &[usize]) -> Option<usize> {
    if index.len() != shape.len() {
        return None;
    }
    let mut offset = 0usize;
    for (&i, &n) in index.iter().zip(shape) {
        if i >= n {
            return None;
        }
        offset = offset * n + i;
    }
    Some(offset)
}

/// Advances `index` to the next position of `extents`; false once exhausted
fn advance(index: &mut [usize], extents: &[usize]) -> bool {
    for axis in (0..index.len()).rev() {
        index[axis] += 1;
        if index[axis] < extents[axis] {
            return true;
        }
        index[axis] = 0;
    }
    false
}

/// Calls `f` for every index of `extents` in row-major order
pub(crate) fn for_each_index(extents: &[usize], mut f: impl FnMut(&[usize])) {
    if extents.iter().any(|&n| n == 0) {
        return;
    }
    let mut index = vec![0usize; extents.len()];
    loop {
        f(&index);
        if !advance(&mut index, extents) {
            break;
        }
    }
}

/// Offsets of the block `prefix` x `extents` inside `shape`, row-major
fn block_offsets(shape: &[usize], prefix: &[usize], extents: &[usize]) -> Option<Vec<usize>> {
    let trailing = shape.get(prefix.len()..)?;
    if trailing.len() != extents.len() || extents.iter().zip(trailing).any(|(e, n)| e > n) {
        return None;
    }
    let mut offsets = Vec::with_capacity(extents.iter().product());
    let mut full = Vec::with_capacity(prefix.len() + extents.len());
    let mut ok = true;
    for_each_index(extents, |local| {
        full.clear();
        full.extend_from_slice(prefix);
        full.extend_from_slice(local);
        match ravel(&full, shape) {
            Some(offset) => offsets.push(offset),
            None => ok = false,
        }
    });
    if ok {
        Some(offsets)
    } else {
        None
    }
}

fn scatter<T: Clone>(
    dst: &mut [T],
    shape: &[usize],
    prefix: &[usize],
    extents: &[usize],
    src: impl Iterator<Item = T>,
) -> bool {
    let Some(offsets) = block_offsets(shape, prefix, extents) else {
        return false;
    };
    for (offset, item) in offsets.into_iter().zip(src) {
        match dst.get_mut(offset) {
            Some(slot) => *slot = item,
            None => return false,
        }
    }
    true
}

fn gather<T: Clone>(src: &[T], shape: &[usize], prefix: &[usize], extents: &[usize]) -> Option<Vec<T>> {
    block_offsets(shape, prefix, extents)?
        .into_iter()
        .map(|offset| src.get(offset).cloned())
        .collect()
}

/// Writes `value` into `data` at struct array position `prefix`.
///
/// Returns false when the value does not fit the grid or the buffer type.
pub(crate) fn place(data: &mut VariableData, shape: &[usize], prefix: &[usize], value: &Value) -> bool {
    let extents = value.shape();
    match (data, value) {
        (VariableData::Str(dst), Value::Str(s)) => {
            scatter(dst, shape, prefix, &extents, std::iter::once(s.clone()))
        }
        (VariableData::Str(dst), Value::StrArray(v)) => {
            scatter(dst, shape, prefix, &extents, v.iter().cloned())
        }
        (VariableData::Int(dst), Value::Int(i)) => {
            scatter(dst, shape, prefix, &extents, std::iter::once(*i))
        }
        (VariableData::Int(dst), Value::IntArray(a)) => {
            scatter(dst, shape, prefix, &extents, a.iter().copied())
        }
        (VariableData::Float(dst), Value::Float(f)) => {
            scatter(dst, shape, prefix, &extents, std::iter::once(*f))
        }
        (VariableData::Float(dst), Value::FloatArray(a)) => {
            scatter(dst, shape, prefix, &extents, a.iter().copied())
        }
        (VariableData::Complex(dst), Value::Complex(c)) => {
            scatter(dst, shape, prefix, &extents, std::iter::once(*c))
        }
        (VariableData::Complex(dst), Value::ComplexArray(a)) => {
            scatter(dst, shape, prefix, &extents, a.iter().copied())
        }
        _ => false,
    }
}

/// Reads the block at `prefix` with `extents` as a value of `kind`.
///
/// `Err` carries a reason when the buffer cannot hold such a value.
pub(crate) fn extract(
    data: &VariableData,
    shape: &[usize],
    prefix: &[usize],
    extents: &[usize],
    kind: DataKind,
) -> Result<Value, String> {
    let out_of_bounds = || {
        format!(
            "block {:?} x {:?} lies outside the grid {:?}",
            prefix, extents, shape
        )
    };
    let scalar = extents.is_empty();

    let value = match (data, kind) {
        (VariableData::Str(src), DataKind::Str) => {
            let mut items = gather(src, shape, prefix, extents).ok_or_else(out_of_bounds)?;
            if scalar {
                Value::Str(items.pop().unwrap_or_default())
            } else {
                Value::StrArray(items)
            }
        }
        (VariableData::Int(src), DataKind::Int | DataKind::Flt | DataKind::Cpx) => {
            let items = gather(src, shape, prefix, extents).ok_or_else(out_of_bounds)?;
            match (scalar, items.first()) {
                (true, Some(&i)) => Value::Int(i),
                _ => Value::IntArray(to_array(extents, items)?),
            }
        }
        (VariableData::Float(src), DataKind::Flt | DataKind::Cpx) => {
            let items = gather(src, shape, prefix, extents).ok_or_else(out_of_bounds)?;
            match (scalar, items.first()) {
                (true, Some(&f)) => Value::Float(f),
                _ => Value::FloatArray(to_array(extents, items)?),
            }
        }
        (VariableData::Complex(src), DataKind::Cpx) => {
            let items = gather(src, shape, prefix, extents).ok_or_else(out_of_bounds)?;
            match (scalar, items.first()) {
                (true, Some(&c)) => Value::Complex(c),
                _ => Value::ComplexArray(to_array(extents, items)?),
            }
        }
        (data, kind) => {
            return Err(format!(
                "a {} buffer cannot hold {} values",
                data.dtype().as_str(),
                kind.type_name()
            ))
        }
    };
    Ok(value)
}

fn to_array<T>(extents: &[usize], items: Vec<T>) -> Result<ArrayD<T>, String> {
    ArrayD::from_shape_vec(IxDyn(extents), items).map_err(|e| e.to_string())
}

/// True if a scalar equals the variable's fill value
pub(crate) fn is_fill(value: &Value, fill: Option<&AttrValue>) -> bool {
    match (value, fill) {
        (Value::Str(s), Some(AttrValue::Str(f))) => s == f,
        (Value::Int(i), Some(AttrValue::Int(f))) => i == f,
        (Value::Float(x), Some(AttrValue::Float(f))) => x == f,
        (Value::Float(x), Some(AttrValue::Int(f))) => *x == f64::from(*f),
        (Value::Complex(c), Some(AttrValue::Complex([re, im]))) => *c == Complex64::new(*re, *im),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columnar::DType;

    #[test]
    fn test_ravel() {
        assert_eq!(ravel(&[], &[]), Some(0));
        assert_eq!(ravel(&[1, 2], &[3, 4]), Some(6));
        assert_eq!(ravel(&[3, 0], &[3, 4]), None);
        assert_eq!(ravel(&[1], &[3, 4]), None);
    }

    #[test]
    fn test_for_each_index_is_row_major() {
        let mut seen = Vec::new();
        for_each_index(&[2, 2], |i| seen.push(i.to_vec()));
        assert_eq!(seen, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);

        let mut count = 0;
        for_each_index(&[], |_| count += 1);
        assert_eq!(count, 1);
        for_each_index(&[3, 0], |_| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_place_and_extract_ragged_block() {
        let shape = [2, 3];
        let mut data = VariableData::filled(DType::F64, 6);
        assert!(place(&mut data, &shape, &[1], &Value::from(vec![1.0f64, 2.0])));

        let row = extract(&data, &shape, &[1], &[2], DataKind::Flt).unwrap();
        assert_eq!(row, Value::from(vec![1.0f64, 2.0]));

        let padded = extract(&data, &shape, &[0], &[3], DataKind::Flt).unwrap();
        assert_eq!(padded.shape(), vec![3]);
    }

    #[test]
    fn test_place_rejects_overflow_and_wrong_type() {
        let mut data = VariableData::filled(DType::F64, 2);
        assert!(!place(&mut data, &[2], &[], &Value::from(vec![1.0f64, 2.0, 3.0])));
        assert!(!place(&mut data, &[2], &[], &Value::from(vec!["a"])));
    }

    #[test]
    fn test_extract_scalar_and_kind_mismatch() {
        let data = VariableData::Int(vec![4, 5]);
        assert_eq!(extract(&data, &[2], &[1], &[], DataKind::Int).unwrap(), Value::Int(5));
        assert!(extract(&data, &[2], &[1], &[], DataKind::Str).is_err());
        assert!(extract(&data, &[2], &[2], &[], DataKind::Int).is_err());
    }

    #[test]
    fn test_extents_beyond_the_grid_are_rejected() {
        let data = VariableData::Int(vec![1, 2, 3]);
        assert!(extract(&data, &[3], &[], &[usize::MAX], DataKind::Int).is_err());
        assert!(extract(&data, &[3], &[], &[2, 2], DataKind::Int).is_err());
        assert_eq!(
            extract(&data, &[3], &[], &[2], DataKind::Int).unwrap(),
            Value::from(vec![1i32, 2])
        );
    }

    #[test]
    fn test_is_fill() {
        let fill = DType::F64.fill_value();
        assert!(is_fill(&Value::Float(crate::tree::EMPTY_FLOAT), Some(&fill)));
        assert!(!is_fill(&Value::Float(1.0), Some(&fill)));
        assert!(!is_fill(&Value::Float(1.0), None));
    }
}
