//! Leaf values and assignment coercion
//!
//! Coercion only ever widens: INT to FLT to CPX. Rank is never changed,
//! except that a nested [`Value::List`] is packed into a rectangular array
//! of the declared rank.

use ndarray::{Array, Array1, ArrayD, Dimension, IxDyn};
use num_complex::Complex64;

use crate::schema::DataKind;

/// Fill value of an unset INT leaf
pub const EMPTY_INT: i32 = -999_999_999;
/// Fill value of an unset FLT leaf
pub const EMPTY_FLOAT: f64 = -9.0e40;
/// Fill value of an unset CPX leaf
pub const EMPTY_COMPLEX: Complex64 = Complex64 {
    re: EMPTY_FLOAT,
    im: EMPTY_FLOAT,
};

/// A leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i32),
    Float(f64),
    Complex(Complex64),
    StrArray(Vec<String>),
    IntArray(ArrayD<i32>),
    FloatArray(ArrayD<f64>),
    ComplexArray(ArrayD<Complex64>),
    /// Nested list input; packed into an array on assignment
    List(Vec<Value>),
}

impl Value {
    /// The value an untouched leaf of this kind and rank reports
    pub fn default_for(kind: DataKind, ndim: usize) -> Value {
        let empty = IxDyn(&vec![0; ndim]);
        match (kind, ndim) {
            (DataKind::Str, 0) => Value::Str(String::new()),
            (DataKind::Str, _) => Value::StrArray(Vec::new()),
            (DataKind::Int, 0) => Value::Int(EMPTY_INT),
            (DataKind::Int, _) => Value::IntArray(ArrayD::zeros(empty)),
            (DataKind::Flt, 0) => Value::Float(EMPTY_FLOAT),
            (DataKind::Flt, _) => Value::FloatArray(ArrayD::zeros(empty)),
            (DataKind::Cpx, 0) => Value::Complex(EMPTY_COMPLEX),
            (DataKind::Cpx, _) => Value::ComplexArray(ArrayD::zeros(empty)),
            // Containers never hold values; callers only ask for data kinds
            (DataKind::Structure, _) | (DataKind::StructArray, _) => Value::List(Vec::new()),
        }
    }

    /// True for empty strings, empty arrays and the EMPTY_* sentinels
    pub fn is_default(&self) -> bool {
        match self {
            Value::Str(s) => s.is_empty(),
            Value::Int(i) => *i == EMPTY_INT,
            Value::Float(f) => *f == EMPTY_FLOAT,
            Value::Complex(c) => *c == EMPTY_COMPLEX,
            Value::StrArray(v) => v.is_empty(),
            Value::IntArray(a) => a.is_empty(),
            Value::FloatArray(a) => a.is_empty(),
            Value::ComplexArray(a) => a.is_empty(),
            Value::List(v) => v.is_empty(),
        }
    }

    /// Rank of the value; 0 for scalars
    pub fn ndim(&self) -> usize {
        match self {
            Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Complex(_) => 0,
            Value::StrArray(_) | Value::List(_) => 1,
            Value::IntArray(a) => a.ndim(),
            Value::FloatArray(a) => a.ndim(),
            Value::ComplexArray(a) => a.ndim(),
        }
    }

    /// Extent along each axis; empty for scalars
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Complex(_) => Vec::new(),
            Value::StrArray(v) => vec![v.len()],
            Value::List(v) => vec![v.len()],
            Value::IntArray(a) => a.shape().to_vec(),
            Value::FloatArray(a) => a.shape().to_vec(),
            Value::ComplexArray(a) => a.shape().to_vec(),
        }
    }

    /// Short label such as `FLT_1D` used in error messages
    pub fn type_label(&self) -> String {
        let kind = match self {
            Value::Str(_) | Value::StrArray(_) => "STR",
            Value::Int(_) | Value::IntArray(_) => "INT",
            Value::Float(_) | Value::FloatArray(_) => "FLT",
            Value::Complex(_) | Value::ComplexArray(_) => "CPX",
            Value::List(_) => return "list".to_string(),
        };
        format!("{}_{}D", kind, self.ndim())
    }

    /// Converts this value to the declared kind and rank of a leaf
    pub fn coerce(self, kind: DataKind, ndim: usize) -> Result<Value, String> {
        let expected = format!("{}_{}D", kind.type_name(), ndim);
        match (kind, ndim, self) {
            (DataKind::Str, 0, Value::Str(s)) => Ok(Value::Str(s)),
            (DataKind::Str, 1, Value::StrArray(v)) => Ok(Value::StrArray(v)),
            (DataKind::Str, 1, Value::List(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Str(s) => Ok(s),
                    other => Err(format!("list item {} is not a string", other.type_label())),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::StrArray),

            (DataKind::Int, 0, Value::Int(i)) => Ok(Value::Int(i)),
            (DataKind::Flt, 0, Value::Float(f)) => Ok(Value::Float(f)),
            (DataKind::Flt, 0, Value::Int(i)) => Ok(Value::Float(f64::from(i))),
            (DataKind::Cpx, 0, Value::Complex(c)) => Ok(Value::Complex(c)),
            (DataKind::Cpx, 0, Value::Float(f)) => Ok(Value::Complex(Complex64::new(f, 0.0))),
            (DataKind::Cpx, 0, Value::Int(i)) => {
                Ok(Value::Complex(Complex64::new(f64::from(i), 0.0)))
            }

            (DataKind::Int, n, Value::IntArray(a)) if a.ndim() == n => Ok(Value::IntArray(a)),
            (DataKind::Flt, n, Value::FloatArray(a)) if a.ndim() == n => Ok(Value::FloatArray(a)),
            (DataKind::Flt, n, Value::IntArray(a)) if a.ndim() == n => {
                Ok(Value::FloatArray(a.mapv(f64::from)))
            }
            (DataKind::Cpx, n, Value::ComplexArray(a)) if a.ndim() == n => {
                Ok(Value::ComplexArray(a))
            }
            (DataKind::Cpx, n, Value::FloatArray(a)) if a.ndim() == n => {
                Ok(Value::ComplexArray(a.mapv(|x| Complex64::new(x, 0.0))))
            }
            (DataKind::Cpx, n, Value::IntArray(a)) if a.ndim() == n => {
                Ok(Value::ComplexArray(a.mapv(|x| Complex64::new(f64::from(x), 0.0))))
            }

            (DataKind::Int | DataKind::Flt | DataKind::Cpx, n, Value::List(items)) if n > 0 => {
                pack_list(items, kind, n)
            }

            (_, _, other) => Err(format!(
                "cannot store {} as {}",
                other.type_label(),
                expected
            )),
        }
    }
}

fn pack_list(items: Vec<Value>, kind: DataKind, ndim: usize) -> Result<Value, String> {
    let mut shape = Vec::with_capacity(ndim);
    let mut flat = Vec::new();
    collect_list(items, 0, ndim, &mut shape, &mut flat)?;
    while shape.len() < ndim {
        shape.push(0);
    }
    let dim = IxDyn(&shape);

    match kind {
        DataKind::Int => {
            let data = flat
                .into_iter()
                .map(|v| match v {
                    Value::Int(i) => Ok(i),
                    other => Err(format!("list item {} is not an integer", other.type_label())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            ArrayD::from_shape_vec(dim, data)
                .map(Value::IntArray)
                .map_err(|e| e.to_string())
        }
        DataKind::Flt => {
            let data = flat
                .into_iter()
                .map(|v| match v {
                    Value::Int(i) => Ok(f64::from(i)),
                    Value::Float(f) => Ok(f),
                    other => Err(format!("list item {} is not a real number", other.type_label())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            ArrayD::from_shape_vec(dim, data)
                .map(Value::FloatArray)
                .map_err(|e| e.to_string())
        }
        _ => {
            let data = flat
                .into_iter()
                .map(|v| match v {
                    Value::Int(i) => Ok(Complex64::new(f64::from(i), 0.0)),
                    Value::Float(f) => Ok(Complex64::new(f, 0.0)),
                    Value::Complex(c) => Ok(c),
                    other => Err(format!("list item {} is not a number", other.type_label())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            ArrayD::from_shape_vec(dim, data)
                .map(Value::ComplexArray)
                .map_err(|e| e.to_string())
        }
    }
}

fn collect_list(
    items: Vec<Value>,
    level: usize,
    ndim: usize,
    shape: &mut Vec<usize>,
    flat: &mut Vec<Value>,
) -> Result<(), String> {
    if level >= ndim {
        return Err(format!("list nests deeper than rank {}", ndim));
    }
    match shape.get(level) {
        Some(&expected) if expected != items.len() => {
            return Err(format!(
                "ragged list: {} items at depth {}, expected {}",
                items.len(),
                level,
                expected
            ));
        }
        Some(_) => {}
        None => shape.push(items.len()),
    }

    for item in items {
        match item {
            Value::List(inner) => collect_list(inner, level + 1, ndim, shape, flat)?,
            scalar if level + 1 == ndim && scalar.ndim() == 0 => flat.push(scalar),
            other => {
                return Err(format!(
                    "unexpected {} at depth {} of a rank {} list",
                    other.type_label(),
                    level,
                    ndim
                ))
            }
        }
    }
    Ok(())
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Complex64> for Value {
    fn from(v: Complex64) -> Self {
        Value::Complex(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StrArray(v)
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::StrArray(v.into_iter().map(String::from).collect())
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::IntArray(Array1::from(v).into_dyn())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::FloatArray(Array1::from(v).into_dyn())
    }
}

impl From<Vec<Complex64>> for Value {
    fn from(v: Vec<Complex64>) -> Self {
        Value::ComplexArray(Array1::from(v).into_dyn())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<D: Dimension> From<Array<i32, D>> for Value {
    fn from(v: Array<i32, D>) -> Self {
        Value::IntArray(v.into_dyn())
    }
}

impl<D: Dimension> From<Array<f64, D>> for Value {
    fn from(v: Array<f64, D>) -> Self {
        Value::FloatArray(v.into_dyn())
    }
}

impl<D: Dimension> From<Array<Complex64, D>> for Value {
    fn from(v: Array<Complex64, D>) -> Self {
        Value::ComplexArray(v.into_dyn())
    }
}
