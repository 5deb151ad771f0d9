//! Storage for the drink catalog

use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::{Drink, DrinkChanges, DrinkId, Recipe, Title, TitleRef};

/// A change the store refused to make
#[derive(Debug, Error)]
pub enum StoreError {
    /// No drink has the given identifier
    #[error("drink {0} not found")]
    NotFound(DrinkId),
    /// Another drink already has the title
    #[error("a drink titled {0:?} already exists")]
    DuplicateTitle(Title),
}

/// Holds the drinks of the catalog
#[async_trait]
pub trait DrinkStore: Send + Sync + fmt::Debug {
    /// Every drink, ordered by identifier
    async fn list(&self) -> Vec<Drink>;

    /// Adds a drink, assigning it a fresh identifier
    ///
    /// # Errors
    ///
    /// `DuplicateTitle` if another drink has the same title.
    async fn insert(&self, title: Title, recipe: Recipe) -> Result<Drink, StoreError>;

    /// Applies `changes` to the drink with identifier `id`
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no such drink, `DuplicateTitle` if another
    /// drink already has the new title.
    async fn update(&self, id: DrinkId, changes: DrinkChanges) -> Result<Drink, StoreError>;

    /// Removes the drink with identifier `id`
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no such drink.
    async fn delete(&self, id: DrinkId) -> Result<Drink, StoreError>;
}

/// A catalog held in process memory
///
/// Identifiers start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryDrinkStore {
    inner: RwLock<Catalog>,
}

#[derive(Debug, Default)]
struct Catalog {
    last_id: u64,
    drinks: BTreeMap<DrinkId, Drink>,
}

impl Catalog {
    fn title_taken(&self, title: &TitleRef, except: Option<DrinkId>) -> bool {
        self.drinks
            .values()
            .any(|d| Some(d.id) != except && d.title.as_str() == title.as_str())
    }
}

impl MemoryDrinkStore {
    /// Constructs an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DrinkStore for MemoryDrinkStore {
    async fn list(&self) -> Vec<Drink> {
        self.inner.read().await.drinks.values().cloned().collect()
    }

    async fn insert(&self, title: Title, recipe: Recipe) -> Result<Drink, StoreError> {
        let mut catalog = self.inner.write().await;

        if catalog.title_taken(&title, None) {
            return Err(StoreError::DuplicateTitle(title));
        }

        catalog.last_id += 1;
        let drink = Drink {
            id: DrinkId(catalog.last_id),
            title,
            recipe,
        };
        catalog.drinks.insert(drink.id, drink.clone());

        tracing::debug!(id = %drink.id, title = %drink.title, "drink added");
        Ok(drink)
    }

    async fn update(&self, id: DrinkId, changes: DrinkChanges) -> Result<Drink, StoreError> {
        let mut catalog = self.inner.write().await;

        if !catalog.drinks.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }

        if let Some(title) = changes.title.as_deref() {
            if catalog.title_taken(title, Some(id)) {
                return Err(StoreError::DuplicateTitle(title.to_owned()));
            }
        }

        let drink = catalog
            .drinks
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if let Some(title) = changes.title {
            drink.title = title;
        }
        if let Some(recipe) = changes.recipe {
            drink.recipe = recipe;
        }

        tracing::debug!(%id, "drink updated");
        Ok(drink.clone())
    }

    async fn delete(&self, id: DrinkId) -> Result<Drink, StoreError> {
        let drink = self
            .inner
            .write()
            .await
            .drinks
            .remove(&id)
            .ok_or(StoreError::NotFound(id))?;

        tracing::debug!(%id, "drink removed");
        Ok(drink)
    }
}
