use redb::{Database, ReadOnlyTable, ReadTransaction, ReadableDatabase, ReadableTable, WriteTransaction};
use serde_json::{Map, Value};

use super::StoreError;
use super::keys::{
    IN_EDGES_TABLE, NODES_TABLE, OUT_EDGES_TABLE, edge_key, node_edge_prefix, node_key,
    reverse_edge_key,
};

/// Properties stored on a node or relationship.
pub type Properties = Map<String, Value>;

/// A node addressed by its label and identity property.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub label: &'static str,
    pub key_property: &'static str,
    pub key: Value,
}

impl NodeRef {
    pub fn new(label: &'static str, key_property: &'static str, key: Value) -> Self {
        Self {
            label,
            key_property,
            key,
        }
    }

    // `42` and `"42"` render differently, so integer and string keys never collide.
    fn storage_key(&self) -> String {
        node_key(self.label, &self.key.to_string())
    }

    fn edge_prefix(&self) -> String {
        node_edge_prefix(self.label, &self.key.to_string())
    }
}

/// A typed, directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRef {
    pub rel_type: &'static str,
    pub from: NodeRef,
    pub to: NodeRef,
}

impl EdgeRef {
    pub fn new(rel_type: &'static str, from: NodeRef, to: NodeRef) -> Self {
        Self { rel_type, from, to }
    }

    fn out_key(&self) -> String {
        edge_key(&self.from.storage_key(), self.rel_type, &self.to.storage_key())
    }

    fn in_key(&self) -> String {
        edge_key(&self.to.storage_key(), self.rel_type, &self.from.storage_key())
    }
}

/// One property write.
///
/// `Set` overwrites (a JSON `null` removes the property). `Coalesce` writes the
/// value when one is given and otherwise keeps whatever is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Set(String, Value),
    Coalesce(String, Option<Value>),
}

impl Assignment {
    pub fn set(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Assignment::Set(property.into(), value.into())
    }

    pub fn coalesce<V: Into<Value>>(property: impl Into<String>, value: Option<V>) -> Self {
        Assignment::Coalesce(property.into(), value.map(Into::into))
    }
}

/// What a committed write transaction changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounters {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub relationships_created: u64,
    pub relationships_deleted: u64,
    pub properties_set: u64,
}

impl WriteCounters {
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
    }
}

pub struct ReadTx {
    txn: ReadTransaction,
}

impl ReadTx {
    pub(crate) fn begin(db: &Database) -> Result<Self, StoreError> {
        Ok(Self {
            txn: db.begin_read()?,
        })
    }

    /// Opens the node table; enough to prove the store answers.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.txn.open_table(NODES_TABLE)?;
        Ok(())
    }

    pub fn node(&self, node: &NodeRef) -> Result<Option<Properties>, StoreError> {
        let table: ReadOnlyTable<&str, &str> = self.txn.open_table(NODES_TABLE)?;
        load_properties(&table, &node.storage_key())
    }

    pub fn edge(&self, edge: &EdgeRef) -> Result<Option<Properties>, StoreError> {
        let table: ReadOnlyTable<&str, &str> = self.txn.open_table(OUT_EDGES_TABLE)?;
        load_properties(&table, &edge.out_key())
    }
}

pub struct WriteTx {
    txn: WriteTransaction,
    counters: WriteCounters,
}

impl WriteTx {
    pub(crate) fn begin(db: &Database) -> Result<Self, StoreError> {
        Ok(Self {
            txn: db.begin_write()?,
            counters: WriteCounters::default(),
        })
    }

    pub(crate) fn commit(self) -> Result<WriteCounters, StoreError> {
        self.txn.commit()?;
        Ok(self.counters)
    }

    /// Creates the node if absent, then applies `assignments` to it.
    pub fn merge_node(
        &mut self,
        node: &NodeRef,
        assignments: &[Assignment],
    ) -> Result<(), StoreError> {
        let key = node.storage_key();
        let mut table = self.txn.open_table(NODES_TABLE)?;
        let (mut properties, created) = match load_properties(&table, &key)? {
            Some(properties) => (properties, false),
            None => {
                let mut properties = Properties::new();
                properties.insert(node.key_property.to_string(), node.key.clone());
                (properties, true)
            }
        };

        let mut changed = apply_assignments(&mut properties, assignments);
        if created {
            self.counters.nodes_created += 1;
            changed += 1;
        }
        if changed > 0 {
            let encoded = serde_json::to_string(&properties)?;
            table.insert(key.as_str(), encoded.as_str())?;
        }
        self.counters.properties_set += changed;
        Ok(())
    }

    /// Applies `assignments` to an existing node. Returns whether it matched.
    pub fn update_node(
        &mut self,
        node: &NodeRef,
        assignments: &[Assignment],
    ) -> Result<bool, StoreError> {
        let key = node.storage_key();
        let mut table = self.txn.open_table(NODES_TABLE)?;
        let mut properties = match load_properties(&table, &key)? {
            Some(properties) => properties,
            None => return Ok(false),
        };

        let changed = apply_assignments(&mut properties, assignments);
        if changed > 0 {
            let encoded = serde_json::to_string(&properties)?;
            table.insert(key.as_str(), encoded.as_str())?;
        }
        self.counters.properties_set += changed;
        Ok(true)
    }

    /// Deletes the node together with every relationship touching it.
    pub fn detach_delete_node(&mut self, node: &NodeRef) -> Result<bool, StoreError> {
        let key = node.storage_key();
        {
            let mut nodes = self.txn.open_table(NODES_TABLE)?;
            if nodes.remove(key.as_str())?.is_none() {
                return Ok(false);
            }
        }
        self.counters.nodes_deleted += 1;

        let prefix = node.edge_prefix();
        let mut outgoing_table = self.txn.open_table(OUT_EDGES_TABLE)?;
        let mut incoming_table = self.txn.open_table(IN_EDGES_TABLE)?;
        let outgoing = keys_with_prefix(&outgoing_table, &prefix)?;
        let incoming = keys_with_prefix(&incoming_table, &prefix)?;

        for out_key in &outgoing {
            outgoing_table.remove(out_key.as_str())?;
            if let Some(in_key) = reverse_edge_key(out_key) {
                incoming_table.remove(in_key.as_str())?;
            }
            self.counters.relationships_deleted += 1;
        }
        for in_key in &incoming {
            incoming_table.remove(in_key.as_str())?;
            if let Some(out_key) = reverse_edge_key(in_key) {
                // Self-loops were already removed with the outgoing set.
                if outgoing_table.remove(out_key.as_str())?.is_some() {
                    self.counters.relationships_deleted += 1;
                }
            }
        }
        Ok(true)
    }

    /// Creates the relationship if absent and applies `assignments`.
    ///
    /// Returns `false` without writing when either endpoint does not exist.
    pub fn merge_edge(
        &mut self,
        edge: &EdgeRef,
        assignments: &[Assignment],
    ) -> Result<bool, StoreError> {
        {
            let nodes = self.txn.open_table(NODES_TABLE)?;
            if nodes.get(edge.from.storage_key().as_str())?.is_none()
                || nodes.get(edge.to.storage_key().as_str())?.is_none()
            {
                return Ok(false);
            }
        }

        let key = edge.out_key();
        let mut table = self.txn.open_table(OUT_EDGES_TABLE)?;
        let (mut properties, created) = match load_properties(&table, &key)? {
            Some(properties) => (properties, false),
            None => (Properties::new(), true),
        };

        let changed = apply_assignments(&mut properties, assignments);
        if created || changed > 0 {
            let encoded = serde_json::to_string(&properties)?;
            table.insert(key.as_str(), encoded.as_str())?;
        }
        if created {
            let mut incoming = self.txn.open_table(IN_EDGES_TABLE)?;
            incoming.insert(edge.in_key().as_str(), "")?;
            self.counters.relationships_created += 1;
        }
        self.counters.properties_set += changed;
        Ok(true)
    }

    /// Applies `assignments` to an existing relationship. Returns whether it matched.
    pub fn update_edge(
        &mut self,
        edge: &EdgeRef,
        assignments: &[Assignment],
    ) -> Result<bool, StoreError> {
        let key = edge.out_key();
        let mut table = self.txn.open_table(OUT_EDGES_TABLE)?;
        let mut properties = match load_properties(&table, &key)? {
            Some(properties) => properties,
            None => return Ok(false),
        };

        let changed = apply_assignments(&mut properties, assignments);
        if changed > 0 {
            let encoded = serde_json::to_string(&properties)?;
            table.insert(key.as_str(), encoded.as_str())?;
        }
        self.counters.properties_set += changed;
        Ok(true)
    }

    /// Removes the relationship only; its endpoints stay.
    pub fn delete_edge(&mut self, edge: &EdgeRef) -> Result<bool, StoreError> {
        let mut outgoing = self.txn.open_table(OUT_EDGES_TABLE)?;
        if outgoing.remove(edge.out_key().as_str())?.is_none() {
            return Ok(false);
        }
        let mut incoming = self.txn.open_table(IN_EDGES_TABLE)?;
        incoming.remove(edge.in_key().as_str())?;
        self.counters.relationships_deleted += 1;
        Ok(true)
    }
}

fn load_properties<T>(table: &T, key: &str) -> Result<Option<Properties>, StoreError>
where
    T: ReadableTable<&'static str, &'static str>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
        None => Ok(None),
    }
}

fn keys_with_prefix<T>(table: &T, prefix: &str) -> Result<Vec<String>, StoreError>
where
    T: ReadableTable<&'static str, &'static str>,
{
    type StrGuard<'a> = redb::AccessGuard<'a, &'static str>;

    let mut keys = Vec::new();
    for entry in table.range(prefix..)? {
        let (key, _): (StrGuard<'_>, StrGuard<'_>) = entry?;
        let key_value = key.value();
        if !key_value.starts_with(prefix) {
            break;
        }
        keys.push(key_value.to_string());
    }
    Ok(keys)
}

/// Returns how many properties actually changed.
fn apply_assignments(properties: &mut Properties, assignments: &[Assignment]) -> u64 {
    let mut changed = 0;
    for assignment in assignments {
        let (property, value) = match assignment {
            Assignment::Set(property, value) => (property, value),
            Assignment::Coalesce(property, Some(value)) => (property, value),
            Assignment::Coalesce(_, None) => continue,
        };

        if value.is_null() {
            if properties.remove(property).is_some() {
                changed += 1;
            }
        } else if properties.get(property) != Some(value) {
            properties.insert(property.clone(), value.clone());
            changed += 1;
        }
    }
    changed
}
