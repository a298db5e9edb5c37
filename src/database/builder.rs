//! Database Builder
//!
//! Front end shared by `create` and `create_or_open`. In create mode every
//! declaration is written as soon as it is added. In create-or-open mode
//! declarations are recorded and checked against the existing file at
//! `finish`; the first mismatch discards the file and replays every
//! declaration into a fresh one.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::serializer::{FixedSizeSerializer, Serializer};

use super::create::{ArrayPlan, Comparator, CreationBuilder, Generator};
use super::open::OpeningBuilder;
use super::{Database, SerializerHandle};

/// A recorded declaration whose element type has been erased
trait PendingArray {
    /// Check the declaration against the next header of an existing file
    fn validate(&self, opening: &mut OpeningBuilder) -> Result<()>;

    /// Write the array into a new file
    fn build(self: Box<Self>, creation: &mut CreationBuilder) -> Result<()>;
}

impl<T: 'static> PendingArray for ArrayPlan<T> {
    fn validate(&self, opening: &mut OpeningBuilder) -> Result<()> {
        opening.push_array(self.handle.clone())
    }

    fn build(self: Box<Self>, creation: &mut CreationBuilder) -> Result<()> {
        creation.write_array(*self)
    }
}

enum Mode {
    Create(CreationBuilder),
    CreateOrOpen {
        path: PathBuf,
        schema_id: Uuid,
        config: Config,
        opening: OpeningBuilder,
        pending: Vec<Box<dyn PendingArray>>,
    },
}

/// Declares the arrays of a database being created (or possibly reopened)
///
/// Generators receive the arrays declared before them through a
/// `&Database`, so later arrays can be derived from earlier ones.
pub struct DatabaseBuilder {
    mode: Mode,
}

impl DatabaseBuilder {
    pub(crate) fn create(path: &Path, schema_id: Uuid, config: Config) -> Result<Self> {
        Ok(Self {
            mode: Mode::Create(CreationBuilder::new(path, schema_id, config)?),
        })
    }

    pub(crate) fn create_or_open(path: &Path, schema_id: Uuid, config: Config) -> Result<Self> {
        match OpeningBuilder::new(path, schema_id, config.clone()) {
            Ok(opening) => Ok(Self {
                mode: Mode::CreateOrOpen {
                    path: path.to_path_buf(),
                    schema_id,
                    config,
                    opening,
                    pending: Vec::new(),
                },
            }),
            Err(e) if e.is_rebuildable() => {
                warn!(path = %path.display(), error = %e, "Existing file unusable, creating");
                Self::create(path, schema_id, config)
            }
            Err(e) => Err(e),
        }
    }

    fn add<T: 'static>(mut self, plan: ArrayPlan<T>) -> Result<Self> {
        match &mut self.mode {
            Mode::Create(creation) => creation.write_array(plan)?,
            Mode::CreateOrOpen { pending, .. } => pending.push(Box::new(plan)),
        }
        Ok(self)
    }

    // =========================================================================
    // Fixed-size (clustered) arrays
    // =========================================================================

    /// Add a clustered array in generator order
    pub fn add_fixed_array<T, S, G, I>(self, serializer: S, generator: G) -> Result<Self>
    where
        T: 'static,
        S: FixedSizeSerializer<T> + 'static,
        G: FnOnce(&Database) -> Result<I> + 'static,
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
    {
        self.add(ArrayPlan {
            handle: SerializerHandle::fixed(serializer)?,
            generator: boxed_generator(generator),
            comparator: None,
        })
    }

    /// Add a clustered array sorted by `compare`
    pub fn add_fixed_array_sorted_by<T, S, G, I, C>(
        self,
        serializer: S,
        generator: G,
        compare: C,
    ) -> Result<Self>
    where
        T: 'static,
        S: FixedSizeSerializer<T> + 'static,
        G: FnOnce(&Database) -> Result<I> + 'static,
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
        C: Fn(&T, &T) -> Ordering + 'static,
    {
        self.add(ArrayPlan {
            handle: SerializerHandle::fixed(serializer)?,
            generator: boxed_generator(generator),
            comparator: Some(Box::new(compare)),
        })
    }

    /// Add a clustered array sorted by the key `key_fn` extracts
    pub fn add_fixed_array_sorted_by_key<T, S, G, I, K, F>(
        self,
        serializer: S,
        generator: G,
        key_fn: F,
    ) -> Result<Self>
    where
        T: 'static,
        S: FixedSizeSerializer<T> + 'static,
        G: FnOnce(&Database) -> Result<I> + 'static,
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
        K: Ord,
        F: Fn(&T) -> K + 'static,
    {
        self.add(ArrayPlan {
            handle: SerializerHandle::fixed(serializer)?,
            generator: boxed_generator(generator),
            comparator: Some(by_key(key_fn)),
        })
    }

    // =========================================================================
    // Variable-size (indirect) arrays
    // =========================================================================

    /// Add an indirect array in generator order
    pub fn add_variable_array<T, S, G, I>(self, serializer: S, generator: G) -> Result<Self>
    where
        T: 'static,
        S: Serializer<T> + 'static,
        G: FnOnce(&Database) -> Result<I> + 'static,
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
    {
        self.add(ArrayPlan {
            handle: SerializerHandle::variable(serializer),
            generator: boxed_generator(generator),
            comparator: None,
        })
    }

    /// Add an indirect array sorted by `compare`
    pub fn add_variable_array_sorted_by<T, S, G, I, C>(
        self,
        serializer: S,
        generator: G,
        compare: C,
    ) -> Result<Self>
    where
        T: 'static,
        S: Serializer<T> + 'static,
        G: FnOnce(&Database) -> Result<I> + 'static,
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
        C: Fn(&T, &T) -> Ordering + 'static,
    {
        self.add(ArrayPlan {
            handle: SerializerHandle::variable(serializer),
            generator: boxed_generator(generator),
            comparator: Some(Box::new(compare)),
        })
    }

    /// Add an indirect array sorted by the key `key_fn` extracts
    pub fn add_variable_array_sorted_by_key<T, S, G, I, K, F>(
        self,
        serializer: S,
        generator: G,
        key_fn: F,
    ) -> Result<Self>
    where
        T: 'static,
        S: Serializer<T> + 'static,
        G: FnOnce(&Database) -> Result<I> + 'static,
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
        K: Ord,
        F: Fn(&T) -> K + 'static,
    {
        self.add(ArrayPlan {
            handle: SerializerHandle::variable(serializer),
            generator: boxed_generator(generator),
            comparator: Some(by_key(key_fn)),
        })
    }

    // =========================================================================
    // Finish
    // =========================================================================

    /// Finalize the file (or accept the existing one) and return the database
    pub fn finish(self) -> Result<Database> {
        match self.mode {
            Mode::Create(creation) => creation.finish(),
            Mode::CreateOrOpen {
                path,
                schema_id,
                config,
                mut opening,
                pending,
            } => {
                let mut mismatch = None;
                for plan in &pending {
                    match plan.validate(&mut opening) {
                        Ok(()) => {}
                        Err(e) if e.is_rebuildable() => {
                            mismatch = Some(e);
                            break;
                        }
                        Err(e) => return Err(e),
                    }
                }

                let Some(reason) = mismatch else {
                    return opening.finish();
                };

                warn!(
                    path = %path.display(),
                    error = %reason,
                    "Declarations do not match existing file, discarding it"
                );
                drop(opening);

                let mut creation = CreationBuilder::new(&path, schema_id, config)?;
                for plan in pending {
                    plan.build(&mut creation)?;
                }
                let database = creation.finish()?;
                info!(path = %path.display(), "Rebuilt database");
                Ok(database)
            }
        }
    }
}

fn boxed_generator<T, G, I>(generator: G) -> Generator<T>
where
    T: 'static,
    G: FnOnce(&Database) -> Result<I> + 'static,
    I: IntoIterator<Item = Result<T>>,
    I::IntoIter: 'static,
{
    Box::new(move |database: &Database| {
        let elements = generator(database)?.into_iter();
        Ok(Box::new(elements) as Box<dyn Iterator<Item = Result<T>>>)
    })
}

fn by_key<T, K, F>(key_fn: F) -> Comparator<T>
where
    K: Ord,
    F: Fn(&T) -> K + 'static,
{
    Box::new(move |a: &T, b: &T| key_fn(a).cmp(&key_fn(b)))
}
