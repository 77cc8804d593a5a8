// ============================================================================
// Queries
// ============================================================================
//
// A query specification is an opaque value; its concrete type selects the
// processor that runs it. Processors are registered per type, in the same
// way expression plugins are registered with their registry.
//
// ============================================================================

use crate::adapter::{DomainObject, RootOid};
use crate::core::{MetaError, Result};
use crate::storage::{RecordReader, StoredRecord};
use async_trait::async_trait;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt::Debug;

/// A query over the instances of one type.
pub trait QuerySpec: Any + Debug + Send + Sync {
    fn spec_id(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Every instance of a type.
#[derive(Debug, Clone)]
pub struct FindAll {
    pub spec_id: String,
}

impl FindAll {
    pub fn new(spec_id: impl Into<String>) -> Self {
        Self {
            spec_id: spec_id.into(),
        }
    }
}

/// Instances whose state contains every field of `pattern` with an equal
/// value.
#[derive(Debug, Clone)]
pub struct FindByPattern {
    pub spec_id: String,
    pub pattern: DomainObject,
}

impl FindByPattern {
    pub fn new(spec_id: impl Into<String>, pattern: DomainObject) -> Self {
        Self {
            spec_id: spec_id.into(),
            pattern,
        }
    }
}

/// Instances with the given keys, in the order given. Missing keys are
/// skipped.
#[derive(Debug, Clone)]
pub struct FindByKeys {
    pub spec_id: String,
    pub keys: Vec<String>,
}

impl FindByKeys {
    pub fn new(spec_id: impl Into<String>, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            spec_id: spec_id.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

macro_rules! query_spec {
    ($($ty:ty),*) => {
        $(
            impl QuerySpec for $ty {
                fn spec_id(&self) -> &str {
                    &self.spec_id
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

query_spec!(FindAll, FindByPattern, FindByKeys);

/// Runs one kind of query against a record source.
#[async_trait]
pub trait QueryProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, query: &dyn QuerySpec, reader: &dyn RecordReader) -> Result<Vec<StoredRecord>>;
}

fn downcast<'q, Q: QuerySpec>(query: &'q dyn QuerySpec) -> Result<&'q Q> {
    query.as_any().downcast_ref::<Q>().ok_or_else(|| {
        MetaError::IllegalArgument(format!(
            "Query {:?} is not a {}",
            query,
            type_name::<Q>()
        ))
    })
}

pub struct FindAllProcessor;

#[async_trait]
impl QueryProcessor for FindAllProcessor {
    fn name(&self) -> &'static str {
        "FindAllProcessor"
    }

    async fn process(&self, query: &dyn QuerySpec, reader: &dyn RecordReader) -> Result<Vec<StoredRecord>> {
        let query = downcast::<FindAll>(query)?;
        reader.scan(&query.spec_id).await
    }
}

pub struct FindByPatternProcessor;

#[async_trait]
impl QueryProcessor for FindByPatternProcessor {
    fn name(&self) -> &'static str {
        "FindByPatternProcessor"
    }

    async fn process(&self, query: &dyn QuerySpec, reader: &dyn RecordReader) -> Result<Vec<StoredRecord>> {
        let query = downcast::<FindByPattern>(query)?;
        let records = reader.scan(&query.spec_id).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.state.matches(&query.pattern))
            .collect())
    }
}

pub struct FindByKeysProcessor;

#[async_trait]
impl QueryProcessor for FindByKeysProcessor {
    fn name(&self) -> &'static str {
        "FindByKeysProcessor"
    }

    async fn process(&self, query: &dyn QuerySpec, reader: &dyn RecordReader) -> Result<Vec<StoredRecord>> {
        let query = downcast::<FindByKeys>(query)?;
        // keys obey the same rules as oid identifiers
        let store_keys = query
            .keys
            .iter()
            .map(|key| RootOid::persistent(&query.spec_id, key)?.store_key())
            .collect::<Result<Vec<_>>>()?;
        let mut records = Vec::with_capacity(store_keys.len());
        for key in &store_keys {
            if let Some(record) = reader.load(key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Query processors keyed by the concrete query type.
pub struct QueryProcessorRegistry {
    processors: HashMap<TypeId, Box<dyn QueryProcessor>>,
}

impl QueryProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    pub fn register<Q: QuerySpec>(&mut self, processor: Box<dyn QueryProcessor>) {
        tracing::debug!(
            query = type_name::<Q>(),
            processor = processor.name(),
            "registered query processor"
        );
        self.processors.insert(TypeId::of::<Q>(), processor);
    }

    pub fn with_default_processors() -> Self {
        let mut registry = Self::new();
        registry.register::<FindAll>(Box::new(FindAllProcessor));
        registry.register::<FindByPattern>(Box::new(FindByPatternProcessor));
        registry.register::<FindByKeys>(Box::new(FindByKeysProcessor));
        registry
    }

    pub fn supports(&self, query: &dyn QuerySpec) -> bool {
        self.processors.contains_key(&query.as_any().type_id())
    }

    pub async fn process(&self, query: &dyn QuerySpec, reader: &dyn RecordReader) -> Result<Vec<StoredRecord>> {
        let processor = self
            .processors
            .get(&query.as_any().type_id())
            .ok_or_else(|| {
                MetaError::UnsupportedOperation(format!("No query processor for {:?}", query))
            })?;
        processor.process(query, reader).await
    }
}

impl Default for QueryProcessorRegistry {
    fn default() -> Self {
        Self::with_default_processors()
    }
}
