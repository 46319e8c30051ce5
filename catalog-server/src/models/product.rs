//! Product entity and validated inputs
//!
//! `NewProduct` and `ProductPatch` can only be built through their
//! validating constructors, so repositories never see out-of-bounds data.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ValidationError;

/// Storage-generated product identifier (`SERIAL`)
pub type ProductId = i32;

/// Maximum length of `name`, matching `VARCHAR(255)`
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of `description`, matching `VARCHAR(1000)`
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Persisted product row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Price in minor currency units (cents)
    pub price: i32,
}

/// Fields for a product that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    name: String,
    description: String,
    price: i32,
}

impl NewProduct {
    /// Validate all fields of a new product.
    ///
    /// # Example
    /// ```
    /// use catalog_server::models::NewProduct;
    ///
    /// assert!(NewProduct::new("Pen", "Blue ink", 150).is_ok());
    /// assert!(NewProduct::new("  ", "Blue ink", 150).is_err());
    /// assert!(NewProduct::new("Pen", "Blue ink", -1).is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: i32,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let description = description.into();
        validate_name(&name)?;
        validate_description(&description)?;
        validate_price(price)?;
        Ok(Self {
            name,
            description,
            price,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> i32 {
        self.price
    }

    /// Attach a storage-assigned id.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
        }
    }
}

/// Partial update: `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    name: Option<String>,
    description: Option<String>,
    price: Option<i32>,
}

impl ProductPatch {
    /// Validate only the fields that are present.
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        price: Option<i32>,
    ) -> Result<Self, ValidationError> {
        if let Some(name) = &name {
            validate_name(name)?;
        }
        if let Some(description) = &description {
            validate_description(description)?;
        }
        if let Some(price) = price {
            validate_price(price)?;
        }
        Ok(Self {
            name,
            description,
            price,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> Option<i32> {
        self.price
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
    }

    /// Merge present fields onto `product`. The id never changes.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Empty { field: "name" });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name",
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description",
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

fn validate_price(price: i32) -> Result<(), ValidationError> {
    if price < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price",
            min: 0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_product_accepts_valid_fields() {
        let p = NewProduct::new("Pen", "Blue ink", 150).unwrap();
        assert_eq!(p.name(), "Pen");
        assert_eq!(p.description(), "Blue ink");
        assert_eq!(p.price(), 150);
    }

    #[test]
    fn empty_description_and_zero_price_allowed() {
        assert!(NewProduct::new("Freebie", "", 0).is_ok());
    }

    #[test]
    fn blank_name_rejected() {
        let err = NewProduct::new(" \t", "x", 1).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "name" });
    }

    #[test]
    fn name_length_boundary() {
        assert!(NewProduct::new("a".repeat(MAX_NAME_LEN), "", 1).is_ok());
        let err = NewProduct::new("a".repeat(MAX_NAME_LEN + 1), "", 1).unwrap_err();
        assert_eq!(err.field(), "name");
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 255 two-byte characters still fit
        assert!(NewProduct::new("é".repeat(MAX_NAME_LEN), "", 1).is_ok());
    }

    #[test]
    fn description_length_boundary() {
        assert!(NewProduct::new("Pen", "d".repeat(MAX_DESCRIPTION_LEN), 1).is_ok());
        let err = NewProduct::new("Pen", "d".repeat(MAX_DESCRIPTION_LEN + 1), 1).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "description",
                max: MAX_DESCRIPTION_LEN
            }
        );
    }

    #[test]
    fn negative_price_rejected() {
        let err = ProductPatch::new(None, None, Some(-5)).unwrap_err();
        assert_eq!(err.field(), "price");
    }

    #[test]
    fn patch_validates_only_present_fields() {
        let patch = ProductPatch::new(None, None, Some(200)).unwrap();
        assert!(!patch.is_empty());
        assert!(ProductPatch::new(Some(String::new()), None, None).is_err());
    }

    #[test]
    fn default_patch_is_empty() {
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn apply_keeps_absent_fields() {
        let mut product = NewProduct::new("Pen", "Blue ink", 150)
            .unwrap()
            .into_product(7);
        ProductPatch::new(None, None, Some(200))
            .unwrap()
            .apply_to(&mut product);

        assert_eq!(
            product,
            Product {
                id: 7,
                name: "Pen".into(),
                description: "Blue ink".into(),
                price: 200,
            }
        );
    }
}
