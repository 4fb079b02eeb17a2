use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_positive_price;

/// Hive product offered in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Miel de azahar")]
    pub name: String,
    #[schema(example = "Raw orange blossom honey, 500 g jar")]
    pub description: String,
    #[schema(value_type = String, example = "8.50")]
    pub price: Decimal,
    #[schema(example = 24)]
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for POST /api/products
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 120))]
    #[schema(example = "Polen fresco")]
    pub name: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    #[schema(example = "Fresh bee pollen, 250 g")]
    pub description: String,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = String, example = "6.00")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    #[serde(default)]
    #[schema(example = 10)]
    pub stock: i32,
}

impl CreateProduct {
    /// Trim the name so validation and the uniqueness check see the stored value
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

/// Body for PUT /api/products/{id}; omitted fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
}

impl UpdateProduct {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|name| name.trim().to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn propolis() -> CreateProduct {
        CreateProduct {
            name: "Propóleo".to_string(),
            description: "Tintura de propóleo".to_string(),
            price: dec!(12.00),
            stock: 5,
        }
    }

    #[test]
    fn test_create_product_accepts_valid_input() {
        assert!(propolis().validate().is_ok());
    }

    #[test]
    fn test_create_product_rejects_bad_fields() {
        let product = CreateProduct {
            name: String::new(),
            price: dec!(0),
            stock: -1,
            ..propolis()
        };

        let errors = product.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("stock"));
    }

    #[test]
    fn test_blank_names_are_rejected_after_trimming() {
        let product = CreateProduct {
            name: "   ".to_string(),
            ..propolis()
        }
        .normalized();
        assert!(product.validate().unwrap_err().field_errors().contains_key("name"));

        let update = UpdateProduct {
            name: Some("\t ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert!(update.validate().unwrap_err().field_errors().contains_key("name"));
    }

    #[test]
    fn test_normalized_strips_surrounding_whitespace() {
        let product = CreateProduct {
            name: "  Jalea real ".to_string(),
            ..propolis()
        }
        .normalized();
        assert_eq!(product.name, "Jalea real");
    }

    #[test]
    fn test_update_product_checks_only_present_fields() {
        assert!(UpdateProduct::default().validate().is_ok());

        let update = UpdateProduct {
            price: Some(dec!(-3.00)),
            ..Default::default()
        };
        assert!(update.validate().unwrap_err().field_errors().contains_key("price"));
    }

    #[test]
    fn test_price_serializes_as_decimal_string() {
        let product = Product {
            id: 3,
            name: "Cera de abeja".to_string(),
            description: String::new(),
            price: dec!(4.75),
            stock: 40,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], "4.75");
        assert_eq!(json["stock"], 40);
    }
}
