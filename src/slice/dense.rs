//! Dense conversion of a selection

use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;

use super::errors::{SliceError, SliceResult};
use super::view::{Item, Selection, SliceView};
use crate::tree::{Node, Value};

/// A selection as one multi-dimensional array.
///
/// The leading axes are the nesting levels of the selection, the trailing
/// ones those of the selected leaf values.
#[derive(Debug, Clone)]
pub enum DenseArray {
    Int(ArrayD<i32>),
    Float(ArrayD<f64>),
    Complex(ArrayD<Complex64>),
    /// Ragged or non-numeric selections, one element per cell
    Object(ArrayD<Item>),
}

impl DenseArray {
    pub fn shape(&self) -> &[usize] {
        match self {
            DenseArray::Int(a) => a.shape(),
            DenseArray::Float(a) => a.shape(),
            DenseArray::Complex(a) => a.shape(),
            DenseArray::Object(a) => a.shape(),
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, DenseArray::Object(_))
    }

    pub fn as_float(&self) -> Option<&ArrayD<f64>> {
        match self {
            DenseArray::Float(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&ArrayD<i32>> {
        match self {
            DenseArray::Int(a) => Some(a),
            _ => None,
        }
    }
}

/// Flattened numeric contents of equally shaped leaf values
enum Numeric {
    Int(Vec<i32>),
    Float(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Numeric {
    fn start(value: &Value) -> Option<Numeric> {
        match value {
            Value::Int(_) | Value::IntArray(_) => Some(Numeric::Int(Vec::new())),
            Value::Float(_) | Value::FloatArray(_) => Some(Numeric::Float(Vec::new())),
            Value::Complex(_) | Value::ComplexArray(_) => Some(Numeric::Complex(Vec::new())),
            _ => None,
        }
    }

    /// Appends `value`; false when its kind differs
    fn push(&mut self, value: &Value) -> bool {
        match (self, value) {
            (Numeric::Int(v), Value::Int(i)) => v.push(*i),
            (Numeric::Int(v), Value::IntArray(a)) => v.extend(a.iter().copied()),
            (Numeric::Float(v), Value::Float(f)) => v.push(*f),
            (Numeric::Float(v), Value::FloatArray(a)) => v.extend(a.iter().copied()),
            (Numeric::Complex(v), Value::Complex(c)) => v.push(*c),
            (Numeric::Complex(v), Value::ComplexArray(a)) => v.extend(a.iter().copied()),
            _ => return false,
        }
        true
    }

    fn into_dense(self, shape: &[usize]) -> SliceResult<DenseArray> {
        let dim = IxDyn(shape);
        let shaped = |e: ndarray::ShapeError| SliceError::Shape(e.to_string());
        Ok(match self {
            Numeric::Int(v) => DenseArray::Int(ArrayD::from_shape_vec(dim, v).map_err(shaped)?),
            Numeric::Float(v) => {
                DenseArray::Float(ArrayD::from_shape_vec(dim, v).map_err(shaped)?)
            }
            Numeric::Complex(v) => {
                DenseArray::Complex(ArrayD::from_shape_vec(dim, v).map_err(shaped)?)
            }
        })
    }
}

impl SliceView {
    /// Packs the selection into a dense array.
    ///
    /// Equally shaped numeric leaves of one kind give a numeric array;
    /// anything else, ragged nesting included, an object array over the
    /// regular leading levels.
    pub fn to_array(&self) -> SliceResult<DenseArray> {
        let (dims, cells) = self.regular_cells();

        let leaves: Option<Vec<Value>> = cells
            .iter()
            .map(|cell| match cell.as_node() {
                Some(Node::Leaf(leaf)) => Some(leaf.value()),
                _ => None,
            })
            .map(|v| v.transpose())
            .collect::<Result<Option<Vec<_>>, _>>()?;

        if let Some(values) = leaves {
            if let Some(dense) = numeric(&dims, &values)? {
                return Ok(dense);
            }
        }

        let items = cells
            .into_iter()
            .map(cell_item)
            .collect::<SliceResult<Vec<_>>>()?;
        ArrayD::from_shape_vec(IxDyn(&dims), items)
            .map(DenseArray::Object)
            .map_err(|e| SliceError::Shape(e.to_string()))
    }
}

fn numeric(dims: &[usize], values: &[Value]) -> SliceResult<Option<DenseArray>> {
    let Some(first) = values.first() else {
        return Ok(None);
    };
    let Some(mut data) = Numeric::start(first) else {
        return Ok(None);
    };
    let value_shape = first.shape();
    for value in values {
        if value.shape() != value_shape || !data.push(value) {
            return Ok(None);
        }
    }
    let mut shape = dims.to_vec();
    shape.extend(value_shape);
    data.into_dense(&shape).map(Some)
}

fn cell_item(cell: &Selection) -> SliceResult<Item> {
    match cell {
        Selection::Item(node) => Item::of(node),
        Selection::Group(group) => Ok(Item::List(
            group.iter().map(cell_item).collect::<SliceResult<_>>()?,
        )),
    }
}
