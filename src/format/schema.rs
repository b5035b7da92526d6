//! Schema tree resolved from the footer's flat type list.
//!
//! The footer stores types as an array in which each entry names its children
//! by index. Index 0 is the root and entries appear in pre-order, so an index
//! doubles as the column id that statistics are keyed by.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use super::proto;
use crate::error::{Error, Result};

pub use super::proto::TypeKind;

/// Hive defaults for decimals declared without precision/scale.
const DEFAULT_DECIMAL_PRECISION: u32 = 38;
const DEFAULT_DECIMAL_SCALE: u32 = 10;

impl TypeKind {
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            TypeKind::List | TypeKind::Map | TypeKind::Struct | TypeKind::Union
        )
    }

    /// Hive name of a primitive kind; compound kinds get their bare keyword.
    pub fn hive_name(self) -> &'static str {
        match self {
            TypeKind::Boolean => "boolean",
            TypeKind::Byte => "tinyint",
            TypeKind::Short => "smallint",
            TypeKind::Int => "int",
            TypeKind::Long => "bigint",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::String => "string",
            TypeKind::Binary => "binary",
            TypeKind::Timestamp => "timestamp",
            TypeKind::TimestampInstant => "timestamp with local time zone",
            TypeKind::List => "array",
            TypeKind::Map => "map",
            TypeKind::Struct => "struct",
            TypeKind::Union => "uniontype",
            TypeKind::Decimal => "decimal",
            TypeKind::Date => "date",
            TypeKind::Varchar => "varchar",
            TypeKind::Char => "char",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaNode {
    pub column_id: usize,
    pub kind: TypeKind,
    #[serde(rename = "type")]
    pub type_string: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl SchemaNode {
    /// `(field name, child)` pairs of a struct; other kinds yield no names.
    pub fn fields(
        &self,
    ) -> impl DoubleEndedIterator<Item = (Option<&str>, &SchemaNode)> + ExactSizeIterator {
        self.children
            .iter()
            .enumerate()
            .map(|(i, child)| (self.field_names.get(i).map(String::as_str), child))
    }

    fn render(&self, f: &mut dyn fmt::Write) -> fmt::Result {
        match self.kind {
            TypeKind::Struct => {
                f.write_str("struct<")?;
                for (i, (name, child)) in self.fields().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{}:", name.unwrap_or_default())?;
                    child.render(f)?;
                }
                f.write_char('>')
            }
            TypeKind::List | TypeKind::Map | TypeKind::Union => {
                write!(f, "{}<", self.kind.hive_name())?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    child.render(f)?;
                }
                f.write_char('>')
            }
            TypeKind::Decimal => write!(
                f,
                "decimal({},{})",
                self.precision.unwrap_or(DEFAULT_DECIMAL_PRECISION),
                self.scale.unwrap_or(DEFAULT_DECIMAL_SCALE)
            ),
            TypeKind::Varchar | TypeKind::Char => match self.maximum_length {
                Some(len) => write!(f, "{}({len})", self.kind.hive_name()),
                None => f.write_str(self.kind.hive_name()),
            },
            kind => f.write_str(kind.hive_name()),
        }
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f)
    }
}

/// The resolved type tree of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    root: SchemaNode,
    kinds: Vec<TypeKind>,
}

impl Schema {
    /// Resolve the flat type list of a footer into a tree.
    ///
    /// Every entry must be reachable from entry 0 exactly once, children must
    /// come after their parent, and the entries must already be in pre-order.
    pub fn from_types(types: &[proto::Type]) -> Result<Self> {
        let n = types.len();
        if n == 0 {
            return Err(malformed("footer has no types"));
        }

        let mut kinds = Vec::with_capacity(n);
        let mut referenced = vec![false; n];
        for (id, ty) in types.iter().enumerate() {
            let raw = ty
                .kind
                .ok_or_else(|| malformed(format!("type {id} has no kind")))?;
            let kind = TypeKind::try_from(raw)
                .map_err(|_| malformed(format!("type {id} has unknown kind {raw}")))?;
            check_arity(id, kind, ty)?;

            for &child in &ty.subtypes {
                let child = child as usize;
                if child >= n {
                    return Err(malformed(format!(
                        "type {id} references type {child}, but there are only {n}"
                    )));
                }
                if child <= id {
                    return Err(malformed(format!(
                        "type {id} references earlier type {child}"
                    )));
                }
                if std::mem::replace(&mut referenced[child], true) {
                    return Err(malformed(format!("type {child} has more than one parent")));
                }
            }
            kinds.push(kind);
        }
        if referenced[0] {
            return Err(malformed("root type is referenced as a child"));
        }

        // walk from the root; ids must come out as 0, 1, 2, ...
        let mut expected = 0;
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            if id != expected {
                return Err(malformed(format!(
                    "types are not in pre-order: found {id} where {expected} was expected"
                )));
            }
            expected += 1;
            stack.extend(types[id].subtypes.iter().rev().map(|&c| c as usize));
        }
        if expected != n {
            return Err(malformed(format!(
                "{} of {n} types are unreachable from the root",
                n - expected
            )));
        }

        // children have larger ids, so building back to front always finds
        // them finished
        let mut built: Vec<Option<SchemaNode>> = vec![None; n];
        for id in (0..n).rev() {
            let ty = &types[id];
            let children = ty
                .subtypes
                .iter()
                .map(|&c| built[c as usize].take())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| malformed(format!("type {id} has an unresolved child")))?;
            let mut node = SchemaNode {
                column_id: id,
                kind: kinds[id],
                type_string: String::new(),
                field_names: ty.field_names.clone(),
                children,
                maximum_length: ty.maximum_length,
                precision: ty.precision,
                scale: ty.scale,
                attributes: ty
                    .attributes
                    .iter()
                    .map(|pair| {
                        (
                            pair.key.clone().unwrap_or_default(),
                            pair.value.clone().unwrap_or_default(),
                        )
                    })
                    .collect(),
            };
            node.type_string = node.to_string();
            built[id] = Some(node);
        }

        let root = built[0]
            .take()
            .ok_or_else(|| malformed("root type was not resolved"))?;
        Ok(Self { root, kinds })
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Number of types, which is also the number of statistics entries.
    pub fn node_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn kind(&self, column_id: usize) -> Option<TypeKind> {
        self.kinds.get(column_id).copied()
    }

    pub fn kinds(&self) -> &[TypeKind] {
        &self.kinds
    }

    /// All nodes in column id order.
    pub fn nodes(&self) -> Vec<&SchemaNode> {
        let mut out = Vec::with_capacity(self.kinds.len());
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn get(&self, column_id: usize) -> Option<&SchemaNode> {
        let mut node = &self.root;
        loop {
            if node.column_id == column_id {
                return Some(node);
            }
            // the child whose subtree covers column_id is the last one
            // starting at or before it
            node = node
                .children
                .iter()
                .take_while(|child| child.column_id <= column_id)
                .last()?;
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

fn check_arity(id: usize, kind: TypeKind, ty: &proto::Type) -> Result<()> {
    let children = ty.subtypes.len();
    let ok = match kind {
        TypeKind::Struct => ty.field_names.len() == children,
        TypeKind::List => children == 1,
        TypeKind::Map => children == 2,
        TypeKind::Union => children >= 1,
        _ => children == 0,
    };
    if ok {
        return Ok(());
    }
    Err(malformed(match kind {
        TypeKind::Struct => format!(
            "struct type {id} has {children} children but {} field names",
            ty.field_names.len()
        ),
        _ => format!(
            "{} type {id} cannot have {children} children",
            kind.hive_name()
        ),
    }))
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedSchema(reason.into())
}
