//! Structural types assigned to AST nodes and symbol-table entries.
//!
//! Types compare structurally, except classes, which compare by the
//! identity of their declaring symbol-table entry: two classes that share a
//! name in different scopes are different types.

use std::fmt::Display;

use crate::symbol_table::symbol_table::{EntryId, SymbolTable};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum TypeInfo {
    Integer,
    Float,
    String,
    Boolean,
    Complex,
    None,
    /// Not resolved (yet); accepted wherever a type is expected.
    #[default]
    Unknown,
    /// Type of `...`; a body made of it matches any return annotation.
    NotImplemented,
    List(Box<TypeInfo>),
    Dict(Box<TypeInfo>, Box<TypeInfo>),
    KeyValue(Box<TypeInfo>, Box<TypeInfo>),
    Union(Box<TypeInfo>, Box<TypeInfo>),
    Tuple(Vec<TypeInfo>),
    Set(Box<TypeInfo>),
    /// An instance of the class.
    Class(EntryId),
    /// The class itself, as named in an expression.
    ClassObject(EntryId),
    Function {
        ret: Box<TypeInfo>,
        entry: Option<EntryId>,
    },
}

impl TypeInfo {
    pub fn list(element: TypeInfo) -> Self {
        TypeInfo::List(Box::new(element))
    }

    pub fn dict(key: TypeInfo, value: TypeInfo) -> Self {
        TypeInfo::Dict(Box::new(key), Box::new(value))
    }

    pub fn set(element: TypeInfo) -> Self {
        TypeInfo::Set(Box::new(element))
    }

    pub fn function(ret: TypeInfo, entry: Option<EntryId>) -> Self {
        TypeInfo::Function {
            ret: Box::new(ret),
            entry,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeInfo::Integer | TypeInfo::Float)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeInfo::Unknown)
    }

    /// Whether a value of type `other` can stand where `self` is expected.
    pub fn accepts(&self, other: &TypeInfo) -> bool {
        if self == other || self.is_unknown() || other.is_unknown() {
            return true;
        }
        match (self, other) {
            (TypeInfo::NotImplemented, _) | (_, TypeInfo::NotImplemented) => true,
            (TypeInfo::Union(..), _) => {
                let members = self.members();
                other.members().iter().all(|member| members.contains(member))
            }
            (TypeInfo::List(expected), TypeInfo::List(actual))
            | (TypeInfo::Set(expected), TypeInfo::Set(actual)) => expected.accepts(actual),
            (TypeInfo::Dict(expected_key, expected_value), TypeInfo::Dict(key, value)) => {
                expected_key.accepts(key) && expected_value.accepts(value)
            }
            (TypeInfo::Tuple(expected), TypeInfo::Tuple(actual)) => {
                expected.len() == actual.len()
                    && expected.iter().zip(actual).all(|(e, a)| e.accepts(a))
            }
            _ => false,
        }
    }

    /// Members of a (possibly nested) union, or the type itself.
    pub fn members(&self) -> Vec<TypeInfo> {
        let mut members = vec![];
        self.collect_members(&mut members);
        members
    }

    fn collect_members(&self, members: &mut Vec<TypeInfo>) {
        if let TypeInfo::Union(left, right) = self {
            left.collect_members(members);
            right.collect_members(members);
        } else if !members.contains(self) {
            members.push(self.clone());
        }
    }

    /// Union over the distinct types of `types`, in first-seen order.
    ///
    /// Nested unions are flattened; a single distinct type is returned as is
    /// and no types at all give `Unknown`. Any `Unknown` member makes the
    /// whole result `Unknown`.
    pub fn union_of(types: impl IntoIterator<Item = TypeInfo>) -> TypeInfo {
        let mut distinct = vec![];
        for ty in types {
            if ty.is_unknown() {
                return TypeInfo::Unknown;
            }
            ty.collect_members(&mut distinct);
        }

        let mut rest = distinct.into_iter().rev();
        let Some(mut result) = rest.next() else {
            return TypeInfo::Unknown;
        };
        for ty in rest {
            result = TypeInfo::Union(Box::new(ty), Box::new(result));
        }
        result
    }

    /// Element type produced when iterating over a value of this type.
    pub fn iter_element(&self) -> Option<TypeInfo> {
        match self {
            TypeInfo::List(element) | TypeInfo::Set(element) => Some((**element).clone()),
            TypeInfo::Dict(key, _) => Some((**key).clone()),
            TypeInfo::String => Some(TypeInfo::String),
            TypeInfo::Tuple(elements) => Some(TypeInfo::union_of(elements.iter().cloned())),
            TypeInfo::Unknown => Some(TypeInfo::Unknown),
            TypeInfo::Union(..) => {
                let elements: Option<Vec<TypeInfo>> =
                    self.members().iter().map(TypeInfo::iter_element).collect();
                elements.map(TypeInfo::union_of)
            }
            _ => None,
        }
    }

    /// Human-readable spelling, naming classes through the symbol table.
    pub fn render(&self, symbols: &SymbolTable) -> String {
        match self {
            TypeInfo::Class(entry) => symbols.qualified_name(*entry),
            TypeInfo::ClassObject(entry) => format!("type[{}]", symbols.qualified_name(*entry)),
            TypeInfo::Function { ret, entry } => match entry {
                Some(entry) => format!(
                    "def {}() -> {}",
                    symbols.qualified_name(*entry),
                    ret.render(symbols)
                ),
                None => format!("def () -> {}", ret.render(symbols)),
            },
            TypeInfo::List(element) => format!("list[{}]", element.render(symbols)),
            TypeInfo::Set(element) => format!("set[{}]", element.render(symbols)),
            TypeInfo::Dict(key, value) => {
                format!("dict[{}, {}]", key.render(symbols), value.render(symbols))
            }
            TypeInfo::KeyValue(key, value) => {
                format!("{}: {}", key.render(symbols), value.render(symbols))
            }
            TypeInfo::Union(left, right) => {
                format!("{} | {}", left.render(symbols), right.render(symbols))
            }
            TypeInfo::Tuple(elements) => format!(
                "tuple[{}]",
                elements
                    .iter()
                    .map(|element| element.render(symbols))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            primitive => primitive.to_string(),
        }
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeInfo::Integer => write!(f, "int"),
            TypeInfo::Float => write!(f, "float"),
            TypeInfo::String => write!(f, "str"),
            TypeInfo::Boolean => write!(f, "bool"),
            TypeInfo::Complex => write!(f, "complex"),
            TypeInfo::None => write!(f, "None"),
            TypeInfo::Unknown => write!(f, "unknown"),
            TypeInfo::NotImplemented => write!(f, "NotImplemented"),
            TypeInfo::List(element) => write!(f, "list[{}]", element),
            TypeInfo::Set(element) => write!(f, "set[{}]", element),
            TypeInfo::Dict(key, value) => write!(f, "dict[{}, {}]", key, value),
            TypeInfo::KeyValue(key, value) => write!(f, "{}: {}", key, value),
            TypeInfo::Union(left, right) => write!(f, "{} | {}", left, right),
            TypeInfo::Tuple(elements) => {
                write!(f, "tuple[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            TypeInfo::Class(entry) => write!(f, "class{:?}", entry),
            TypeInfo::ClassObject(entry) => write!(f, "type[class{:?}]", entry),
            TypeInfo::Function { ret, .. } => write!(f, "def () -> {}", ret),
        }
    }
}
