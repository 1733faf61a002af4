//! Call context carrying an optional in-flight transaction.
//!
//! # Responsibility
//! - Let repository calls discover the transaction opened by an enclosing
//!   unit of work without threading a separate executor argument.
//! - Carry arbitrary keyed values through the same chain.
//!
//! # Invariants
//! - Derivation never mutates the parent; a derived context only adds.
//! - Lookup returns the transaction attached nearest to the leaf.
//! - A context holding a transaction borrows it, so it cannot outlive the
//!   unit of work that created it. `rusqlite::Transaction` is not `Sync`,
//!   so such contexts are confined to the thread that opened it.
//!
//! # See also
//! - `db::Manager::run_in_transaction`

use std::any::Any;
use std::fmt;
use std::iter;

use rusqlite::Transaction;

/// Immutable, derivable call context.
pub struct Context<'a> {
    parent: Option<&'a Context<'a>>,
    entry: Entry<'a>,
}

enum Entry<'a> {
    Root,
    Transaction(&'a Transaction<'a>),
    Value {
        key: &'static str,
        value: Box<dyn Any + Send + Sync>,
    },
}

impl Context<'static> {
    /// Root context with nothing attached.
    pub fn background() -> Self {
        Self {
            parent: None,
            entry: Entry::Root,
        }
    }
}

impl<'a> Context<'a> {
    /// Derives a child context carrying `tx`.
    pub fn with_transaction<'b>(&'b self, tx: &'b Transaction<'_>) -> Context<'b> {
        Context {
            parent: Some(self),
            entry: Entry::Transaction(tx),
        }
    }

    /// Derives a child context carrying `value` under `key`.
    pub fn with_value<'b, T>(&'b self, key: &'static str, value: T) -> Context<'b>
    where
        T: Any + Send + Sync,
    {
        Context {
            parent: Some(self),
            entry: Entry::Value {
                key,
                value: Box::new(value),
            },
        }
    }

    /// Returns the nearest transaction on the chain, if any.
    pub fn transaction(&self) -> Option<&'a Transaction<'a>> {
        let mut current: &Context<'a> = self;
        loop {
            if let Entry::Transaction(tx) = current.entry {
                return Some(tx);
            }
            current = current.parent?;
        }
    }

    pub fn is_transactional(&self) -> bool {
        self.transaction().is_some()
    }

    /// Returns the nearest value stored under `key` with type `T`.
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        self.chain().find_map(|ctx| match &ctx.entry {
            Entry::Value { key: k, value } if *k == key => value.downcast_ref::<T>(),
            _ => None,
        })
    }

    fn chain(&self) -> impl Iterator<Item = &Context<'a>> {
        iter::successors(Some(self), |ctx| ctx.parent)
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self
            .chain()
            .filter_map(|ctx| match &ctx.entry {
                Entry::Value { key, .. } => Some(*key),
                _ => None,
            })
            .collect();
        f.debug_struct("Context")
            .field("depth", &self.chain().count())
            .field("transactional", &self.is_transactional())
            .field("keys", &keys)
            .finish()
    }
}
