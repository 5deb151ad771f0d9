//! The drink entity and its projections
//!
//! A drink is stored with its full recipe. Anonymous callers see the
//! *short* projection, which hides ingredient names; authorized callers see
//! the *long* projection.

use std::fmt;

use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest title a drink may have, in characters
pub const MAX_TITLE_LEN: usize = 80;

/// Longest serialized recipe a drink may have, in characters
pub const MAX_RECIPE_LEN: usize = 180;

/// Identifies a drink in the catalog
///
/// Identifiers are assigned by the store and are always positive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrinkId(pub u64);

impl fmt::Display for DrinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A drink that cannot be placed in the catalog
#[derive(Debug, Error)]
pub enum InvalidDrink {
    /// The title was the empty string
    #[error("drink title cannot be empty")]
    EmptyTitle,
    /// The title was too long
    #[error("drink title is {len} characters long, longer than {MAX_TITLE_LEN}")]
    TitleTooLong {
        /// The title's length in characters
        len: usize,
    },
    /// The recipe was too long once serialized
    #[error("drink recipe is {len} characters long, longer than {MAX_RECIPE_LEN}")]
    RecipeTooLong {
        /// The serialized recipe's length in characters
        len: usize,
    },
}

impl From<std::convert::Infallible> for InvalidDrink {
    fn from(x: std::convert::Infallible) -> Self {
        match x {}
    }
}

/// The title of a drink, unique within the catalog
#[braid(serde, validator, ref_doc = "A borrowed reference to a [`Title`]")]
pub struct Title;

impl aliri_braid::Validator for Title {
    type Error = InvalidDrink;

    fn validate(s: &str) -> Result<(), Self::Error> {
        let len = s.chars().count();
        if len == 0 {
            Err(InvalidDrink::EmptyTitle)
        } else if len > MAX_TITLE_LEN {
            Err(InvalidDrink::TitleTooLong { len })
        } else {
            Ok(())
        }
    }
}

/// One ingredient of a recipe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// What goes in
    pub name: String,
    /// The color it is drawn with
    pub color: String,
    /// How many parts of the drink it makes up
    pub parts: serde_json::Number,
}

/// The ingredients of a drink, in order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipe(Vec<Ingredient>);

impl Recipe {
    /// Checks that the serialized recipe fits in [`MAX_RECIPE_LEN`]
    /// characters
    ///
    /// # Errors
    ///
    /// The recipe is too long.
    pub fn validate(self) -> Result<Self, InvalidDrink> {
        let len = serde_json::to_string(&self.0)
            .map(|s| s.chars().count())
            .unwrap_or(usize::MAX);

        if len > MAX_RECIPE_LEN {
            Err(InvalidDrink::RecipeTooLong { len })
        } else {
            Ok(self)
        }
    }

    /// Whether the recipe has no ingredients
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The ingredients, in order
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.0
    }
}

impl FromIterator<Ingredient> for Recipe {
    fn from_iter<I: IntoIterator<Item = Ingredient>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A drink in the catalog
#[derive(Clone, Debug, PartialEq)]
pub struct Drink {
    /// The drink's identifier
    pub id: DrinkId,
    /// The drink's title
    pub title: Title,
    /// The drink's recipe
    pub recipe: Recipe,
}

impl Drink {
    /// The projection shown to anonymous callers
    #[must_use]
    pub fn short(&self) -> ShortDrink<'_> {
        ShortDrink {
            id: self.id,
            title: &self.title,
            recipe: self
                .recipe
                .ingredients()
                .iter()
                .map(|i| ShortIngredient {
                    color: &i.color,
                    parts: &i.parts,
                })
                .collect(),
        }
    }

    /// The projection shown to authorized callers
    #[must_use]
    pub fn long(&self) -> LongDrink<'_> {
        LongDrink {
            id: self.id,
            title: &self.title,
            recipe: &self.recipe,
        }
    }
}

/// A drink with ingredient names hidden
#[derive(Debug, Serialize)]
pub struct ShortDrink<'a> {
    id: DrinkId,
    title: &'a TitleRef,
    recipe: Vec<ShortIngredient<'a>>,
}

#[derive(Debug, Serialize)]
struct ShortIngredient<'a> {
    color: &'a str,
    parts: &'a serde_json::Number,
}

/// A drink with its full recipe
#[derive(Debug, Serialize)]
pub struct LongDrink<'a> {
    id: DrinkId,
    title: &'a TitleRef,
    recipe: &'a Recipe,
}

/// A drink to be added to the catalog
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewDrink {
    /// The drink's title
    pub title: String,
    /// The drink's recipe
    pub recipe: Recipe,
}

impl NewDrink {
    /// Checks the title and recipe limits
    ///
    /// # Errors
    ///
    /// The title is empty or too long, or the recipe is too long.
    pub fn validate(self) -> Result<(Title, Recipe), InvalidDrink> {
        let title = Title::new(self.title)?;
        let recipe = self.recipe.validate()?;
        Ok((title, recipe))
    }
}

/// Changes to a drink in the catalog
///
/// An empty title or an empty recipe leaves that part of the drink as it
/// was.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DrinkPatch {
    /// The new title
    #[serde(default)]
    pub title: Option<String>,
    /// The new recipe
    #[serde(default)]
    pub recipe: Option<Recipe>,
}

/// A validated [`DrinkPatch`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrinkChanges {
    /// The new title
    pub title: Option<Title>,
    /// The new recipe
    pub recipe: Option<Recipe>,
}

impl DrinkPatch {
    /// Whether applying the patch would change nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().map_or(true, str::is_empty)
            && self.recipe.as_ref().map_or(true, Recipe::is_empty)
    }

    /// Checks the title and recipe limits of the parts that are changed
    ///
    /// # Errors
    ///
    /// The new title is too long, or the new recipe is too long.
    pub fn validate(self) -> Result<DrinkChanges, InvalidDrink> {
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .map(Title::new)
            .transpose()?;
        let recipe = self
            .recipe
            .filter(|r| !r.is_empty())
            .map(Recipe::validate)
            .transpose()?;

        Ok(DrinkChanges { title, recipe })
    }
}
