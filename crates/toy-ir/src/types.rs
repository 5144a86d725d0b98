//! Tensor type descriptors and interning.

use std::collections::HashMap;
use std::fmt;

use cranelift_entity::PrimaryMap;
use derive_more::Display;
use smallvec::SmallVec;

use super::refs::{NameRef, TypeRef};

// ============================================================================
// ElementKind
// ============================================================================

/// Scalar element type of a tensor.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ElementKind {
    #[display("f32")]
    F32,
    #[display("f64")]
    F64,
    #[display("i32")]
    I32,
    #[display("i64")]
    I64,
}

impl ElementKind {
    /// Look up an element kind by its textual name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "f32" => Some(ElementKind::F32),
            "f64" => Some(ElementKind::F64),
            "i32" => Some(ElementKind::I32),
            "i64" => Some(ElementKind::I64),
            _ => None,
        }
    }
}

// ============================================================================
// TypeData
// ============================================================================

/// Data for a single interned tensor type.
///
/// A `shape` of `None` denotes an unranked tensor (`tensor<*xf64>`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub shape: Option<SmallVec<[u64; 4]>>,
    pub element: ElementKind,
}

impl TypeData {
    pub fn ranked(dims: impl IntoIterator<Item = u64>, element: ElementKind) -> Self {
        Self {
            shape: Some(dims.into_iter().collect()),
            element,
        }
    }

    pub fn unranked(element: ElementKind) -> Self {
        Self {
            shape: None,
            element,
        }
    }

    pub fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(|s| s.len())
    }

    /// The type of this tensor with its dimensions reversed.
    ///
    /// Unranked tensors stay unranked.
    pub fn transposed(&self) -> Self {
        Self {
            shape: self
                .shape
                .as_ref()
                .map(|dims| dims.iter().rev().copied().collect()),
            element: self.element,
        }
    }
}

impl fmt::Display for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tensor<")?;
        match &self.shape {
            None => f.write_str("*x")?,
            Some(dims) => {
                for dim in dims {
                    write!(f, "{dim}x")?;
                }
            }
        }
        write!(f, "{}>", self.element)
    }
}

// ============================================================================
// TypeInterner
// ============================================================================

/// Deduplicating type interner. Same `TypeData` always yields the same `TypeRef`.
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    dedup: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self {
            types: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    /// Intern a type, returning an existing ref if the data matches.
    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.types.push(data.clone());
        self.dedup.insert(data, r);
        r
    }

    /// Look up type data by reference.
    pub fn get(&self, r: TypeRef) -> &TypeData {
        &self.types[r]
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// NameInterner
// ============================================================================

/// Deduplicating interner for the names of `Other` operations.
pub struct NameInterner {
    names: PrimaryMap<NameRef, String>,
    dedup: HashMap<String, NameRef>,
}

impl NameInterner {
    pub fn new() -> Self {
        Self {
            names: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    pub fn intern(&mut self, name: &str) -> NameRef {
        if let Some(&existing) = self.dedup.get(name) {
            return existing;
        }
        let r = self.names.push(name.to_owned());
        self.dedup.insert(name.to_owned(), r);
        r
    }

    pub fn get(&self, r: NameRef) -> &str {
        &self.names[r]
    }
}

impl Default for NameInterner {
    fn default() -> Self {
        Self::new()
    }
}
