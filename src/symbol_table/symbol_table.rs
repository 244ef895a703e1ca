use crate::{
    arena::arena::{Arena, Id, IdRange},
    ast::{ast::NodeId, types::TypeInfo},
    errors::errors::ErrorImpl,
};

/// Buckets per namespace.
pub const TABLE_SIZE: usize = 1024;

const HASH_BASE: u64 = 31;

pub type EntryId = Id<SymbolEntry>;

/// Scopes are identified by the entry of the function or class that opens
/// them; the module scope is the synthetic root entry.
pub type ScopeId = EntryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Variables,
    Functions,
    Classes,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [
        Namespace::Variables,
        Namespace::Functions,
        Namespace::Classes,
    ];

    fn index(self) -> usize {
        match self {
            Namespace::Variables => 0,
            Namespace::Functions => 1,
            Namespace::Classes => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    /// Owning scope; only the root entry has none.
    pub scope: Option<ScopeId>,
    pub value: TypeInfo,
    /// Declaring node, absent for builtins and the root.
    pub node: Option<NodeId>,
    pub namespace: Namespace,
    overflow: Option<EntryId>,
}

/// Three hashed namespaces keyed by (name, scope).
///
/// Entries of all namespaces share one arena, so an `EntryId` is stable for
/// the lifetime of the table and can serve as a scope identifier.
#[derive(Debug)]
pub struct SymbolTable {
    entries: Arena<SymbolEntry>,
    buckets: Arena<Option<EntryId>>,
    tables: [IdRange<Option<EntryId>>; 3],
    root: ScopeId,
}

fn builtin_classes() -> Vec<(&'static str, TypeInfo)> {
    vec![
        ("int", TypeInfo::Integer),
        ("float", TypeInfo::Float),
        ("str", TypeInfo::String),
        ("bool", TypeInfo::Boolean),
        ("complex", TypeInfo::Complex),
        ("list", TypeInfo::list(TypeInfo::Unknown)),
        ("dict", TypeInfo::dict(TypeInfo::Unknown, TypeInfo::Unknown)),
        ("tuple", TypeInfo::Unknown),
        ("set", TypeInfo::set(TypeInfo::Unknown)),
    ]
}

/// Classes whose instances are plain `Class` values.
const BUILTIN_OBJECT_CLASSES: [&str; 13] = [
    "object",
    "BaseException",
    "Exception",
    "ValueError",
    "TypeError",
    "KeyError",
    "IndexError",
    "AttributeError",
    "RuntimeError",
    "StopIteration",
    "ZeroDivisionError",
    "NotImplementedError",
    "AssertionError",
];

fn builtin_functions() -> Vec<(&'static str, TypeInfo)> {
    vec![
        ("print", TypeInfo::None),
        ("len", TypeInfo::Integer),
        ("range", TypeInfo::list(TypeInfo::Integer)),
        ("input", TypeInfo::String),
        ("isinstance", TypeInfo::Boolean),
        ("repr", TypeInfo::String),
        ("sorted", TypeInfo::list(TypeInfo::Unknown)),
        ("enumerate", TypeInfo::list(TypeInfo::Unknown)),
        ("zip", TypeInfo::list(TypeInfo::Unknown)),
        ("abs", TypeInfo::Unknown),
        ("min", TypeInfo::Unknown),
        ("max", TypeInfo::Unknown),
        ("sum", TypeInfo::Unknown),
        ("open", TypeInfo::Unknown),
        ("iter", TypeInfo::Unknown),
        ("next", TypeInfo::Unknown),
        ("super", TypeInfo::Unknown),
        ("staticmethod", TypeInfo::Unknown),
        ("classmethod", TypeInfo::Unknown),
        ("property", TypeInfo::Unknown),
    ]
}

fn hash_name(name: &str) -> u64 {
    name.bytes()
        .fold(0u64, |hash, byte| {
            hash.wrapping_mul(HASH_BASE).wrapping_add(byte as u64)
        })
}

impl SymbolTable {
    pub fn new() -> Result<Self, ErrorImpl> {
        let mut entries = Arena::new();
        let root = entries.alloc(SymbolEntry {
            name: String::from("<module>"),
            scope: None,
            value: TypeInfo::None,
            node: None,
            namespace: Namespace::Variables,
            overflow: None,
        })?;

        let mut buckets = Arena::new();
        let tables = [
            buckets.alloc_slice(vec![None; TABLE_SIZE])?,
            buckets.alloc_slice(vec![None; TABLE_SIZE])?,
            buckets.alloc_slice(vec![None; TABLE_SIZE])?,
        ];

        let mut table = SymbolTable {
            entries,
            buckets,
            tables,
            root,
        };
        table.register_builtins()?;
        Ok(table)
    }

    fn register_builtins(&mut self) -> Result<(), ErrorImpl> {
        let root = self.root;
        for (name, ty) in builtin_classes() {
            self.insert(Namespace::Classes, name, root, ty, None)?;
        }
        for name in BUILTIN_OBJECT_CLASSES {
            let entry = self.insert(Namespace::Classes, name, root, TypeInfo::Unknown, None)?;
            self.set_value(entry, TypeInfo::Class(entry));
        }
        for (name, ret) in builtin_functions() {
            let entry = self.insert(Namespace::Functions, name, root, TypeInfo::Unknown, None)?;
            self.set_value(entry, TypeInfo::function(ret, Some(entry)));
        }
        Ok(())
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Polynomial hash over the identifiers of `scope` and its ancestors.
    fn scope_hash(&self, scope: ScopeId) -> u64 {
        let mut hash = 0u64;
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.entries.get(id);
            hash = hash
                .wrapping_mul(HASH_BASE)
                .wrapping_add(hash_name(&entry.name));
            current = entry.scope;
        }
        hash
    }

    fn bucket(&self, namespace: Namespace, name: &str, scope: ScopeId) -> Id<Option<EntryId>> {
        let hash = hash_name(name)
            .wrapping_mul(HASH_BASE)
            .wrapping_add(self.scope_hash(scope));
        let index = (hash % TABLE_SIZE as u64) as usize;
        // Every table holds exactly TABLE_SIZE buckets.
        let table = self.tables[namespace.index()];
        table.get(index).unwrap_or_else(|| Id::new(0))
    }

    /// Creates the entry for (`name`, `scope`), or overwrites the value of
    /// the existing one. The declaring node is only replaced when given.
    pub fn insert(
        &mut self,
        namespace: Namespace,
        name: &str,
        scope: ScopeId,
        value: TypeInfo,
        node: Option<NodeId>,
    ) -> Result<EntryId, ErrorImpl> {
        if let Some(existing) = self.lookup(namespace, name, scope) {
            let entry = self.entries.get_mut(existing);
            entry.value = value;
            if node.is_some() {
                entry.node = node;
            }
            return Ok(existing);
        }

        let bucket = self.bucket(namespace, name, scope);
        let head = *self.buckets.get(bucket);
        let id = self.entries.alloc(SymbolEntry {
            name: String::from(name),
            scope: Some(scope),
            value,
            node,
            namespace,
            overflow: head,
        })?;
        *self.buckets.get_mut(bucket) = Some(id);
        Ok(id)
    }

    /// Entry for exactly (`name`, `scope`); enclosing scopes are not searched.
    pub fn lookup(&self, namespace: Namespace, name: &str, scope: ScopeId) -> Option<EntryId> {
        let mut current = *self.buckets.get(self.bucket(namespace, name, scope));
        while let Some(id) = current {
            let entry = self.entries.get(id);
            if entry.namespace == namespace && entry.scope == Some(scope) && entry.name == name {
                return Some(id);
            }
            current = entry.overflow;
        }
        None
    }

    pub fn entry(&self, id: EntryId) -> &SymbolEntry {
        self.entries.get(id)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> &mut SymbolEntry {
        self.entries.get_mut(id)
    }

    pub fn value(&self, id: EntryId) -> &TypeInfo {
        &self.entries.get(id).value
    }

    pub fn set_value(&mut self, id: EntryId, value: TypeInfo) {
        self.entries.get_mut(id).value = value;
    }

    /// Entries declared directly in `scope`, in insertion order.
    pub fn entries_in_scope(&self, scope: ScopeId) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.scope == Some(scope))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` is a builtin registered by [`SymbolTable::new`].
    pub fn is_builtin(&self, id: EntryId) -> bool {
        let entry = self.entries.get(id);
        entry.scope == Some(self.root) && entry.node.is_none()
    }

    /// Dotted name of an entry, e.g. `Point.__init__`.
    pub fn qualified_name(&self, id: EntryId) -> String {
        let mut parts = vec![];
        let mut current = Some(id);
        while let Some(entry_id) = current {
            if entry_id == self.root {
                break;
            }
            let entry = self.entries.get(entry_id);
            parts.push(entry.name.as_str());
            current = entry.scope;
        }
        parts.reverse();
        parts.join(".")
    }
}
