//! Repository pattern for database operations
//!
//! Provides a clean interface for all record access operations. Every
//! create runs in its own transaction and is committed before returning.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{is_foreign_key_violation, AppError, Result};
use crate::metrics::{self, OperationTimer};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

/// Largest price representable by `NUMERIC(10, 2)` is just below this
const PRICE_LIMIT: i64 = 100_000_000;

/// Input for [`Repository::create_enterprise`]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewEnterprise {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 100))]
    pub activity_type: Option<String>,

    #[validate(range(min = 0))]
    pub employees_count: Option<i32>,
}

/// Input for [`Repository::create_product`]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    pub price: Option<Decimal>,
}

/// Input for [`Repository::create_supply`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupply {
    pub enterprise_id: i32,
    pub product_id: i32,
    pub quantity: Option<i32>,
    pub supply_date: Option<NaiveDate>,
}

impl NewEnterprise {
    pub fn new(
        name: impl Into<String>,
        activity_type: Option<String>,
        employees_count: Option<i32>,
    ) -> Self {
        Self {
            name: name.into(),
            activity_type,
            employees_count,
        }
    }
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Option<Decimal>) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Repository for record access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Enterprise Operations
    // ========================================================================

    /// Create a new enterprise
    pub async fn create_enterprise(&self, input: NewEnterprise) -> Result<Enterprise> {
        let _timer = OperationTimer::new("create_enterprise");

        input
            .validate()
            .map_err(|e| rejected("enterprise", validation_error(e)))?;
        if input.name.trim().is_empty() {
            return Err(rejected(
                "enterprise",
                AppError::invalid_field("name", "name must not be blank"),
            ));
        }

        let enterprise = EnterpriseActiveModel {
            name: Set(input.name),
            activity_type: Set(input.activity_type),
            employees_count: Set(input.employees_count),
            ..Default::default()
        };

        let txn = self.conn().begin().await?;
        let enterprise = enterprise.insert(&txn).await?;
        txn.commit().await?;

        metrics::record_created("enterprise");
        info!(enterprise_id = enterprise.id, name = %enterprise.name, "Enterprise created");

        Ok(enterprise)
    }

    /// Find enterprise by ID
    pub async fn find_enterprise_by_id(&self, id: i32) -> Result<Option<Enterprise>> {
        EnterpriseEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List all enterprises ordered by ID
    pub async fn list_enterprises(&self) -> Result<Vec<Enterprise>> {
        EnterpriseEntity::find()
            .order_by_asc(EnterpriseColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Product Operations
    // ========================================================================

    /// Create a new product
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let _timer = OperationTimer::new("create_product");

        input
            .validate()
            .map_err(|e| rejected("product", validation_error(e)))?;
        if input.name.trim().is_empty() {
            return Err(rejected(
                "product",
                AppError::invalid_field("name", "name must not be blank"),
            ));
        }
        if let Some(price) = input.price {
            validate_price(price).map_err(|e| rejected("product", e))?;
        }

        let product = ProductActiveModel {
            name: Set(input.name),
            price: Set(input.price),
            ..Default::default()
        };

        let txn = self.conn().begin().await?;
        let product = product.insert(&txn).await?;
        txn.commit().await?;

        metrics::record_created("product");
        info!(product_id = product.id, name = %product.name, "Product created");

        Ok(product)
    }

    /// Find product by ID
    pub async fn find_product_by_id(&self, id: i32) -> Result<Option<Product>> {
        ProductEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List all products ordered by ID
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        ProductEntity::find()
            .order_by_asc(ProductColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Supply Operations
    // ========================================================================

    /// Create a new supply.
    ///
    /// Both referenced rows must exist; otherwise the transaction is rolled
    /// back and [`AppError::ReferentialIntegrity`] is returned.
    pub async fn create_supply(&self, input: NewSupply) -> Result<Supply> {
        let _timer = OperationTimer::new("create_supply");

        let txn = self.conn().begin().await?;

        if EnterpriseEntity::find_by_id(input.enterprise_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(rejected(
                "supply",
                AppError::ReferentialIntegrity {
                    reference: "enterprise".to_string(),
                    id: input.enterprise_id.to_string(),
                },
            ));
        }

        if ProductEntity::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(rejected(
                "supply",
                AppError::ReferentialIntegrity {
                    reference: "product".to_string(),
                    id: input.product_id.to_string(),
                },
            ));
        }

        let supply = SupplyActiveModel {
            enterprise_id: Set(input.enterprise_id),
            product_id: Set(input.product_id),
            quantity: Set(input.quantity),
            supply_date: Set(input.supply_date),
            ..Default::default()
        };

        let supply = supply
            .insert(&txn)
            .await
            .map_err(|e| map_supply_insert_error(e, &input))?;
        txn.commit().await?;

        metrics::record_created("supply");
        info!(
            supply_id = supply.id,
            enterprise_id = supply.enterprise_id,
            product_id = supply.product_id,
            "Supply created"
        );

        Ok(supply)
    }

    /// Find supply by ID
    pub async fn find_supply_by_id(&self, id: i32) -> Result<Option<Supply>> {
        SupplyEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Get supplies delivered to an enterprise, ordered by ID
    pub async fn find_supplies_by_enterprise(&self, enterprise_id: i32) -> Result<Vec<Supply>> {
        SupplyEntity::find()
            .filter(SupplyColumn::EnterpriseId.eq(enterprise_id))
            .order_by_asc(SupplyColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Get supplies of a product, ordered by ID
    pub async fn find_supplies_by_product(&self, product_id: i32) -> Result<Vec<Supply>> {
        SupplyEntity::find()
            .filter(SupplyColumn::ProductId.eq(product_id))
            .order_by_asc(SupplyColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}

/// Price must be non-negative and fit `NUMERIC(10, 2)`
fn validate_price(price: Decimal) -> Result<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::invalid_field("price", "price must not be negative"));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::invalid_field(
            "price",
            "price must have at most 2 fractional digits",
        ));
    }
    if price >= Decimal::from(PRICE_LIMIT) {
        return Err(AppError::invalid_field("price", "price exceeds NUMERIC(10, 2)"));
    }
    Ok(())
}

fn validation_error(errors: ValidationErrors) -> AppError {
    let field = errors.field_errors().keys().next().map(|field| field.to_string());
    AppError::Validation {
        message: errors.to_string(),
        field,
    }
}

/// The database can still reject the insert if a referenced row vanished
/// between the existence check and the insert under weak isolation
fn map_supply_insert_error(err: DbErr, input: &NewSupply) -> AppError {
    if is_foreign_key_violation(&err) {
        rejected(
            "supply",
            AppError::ReferentialIntegrity {
                reference: "enterprise or product".to_string(),
                id: format!(
                    "enterprise_id={}, product_id={}",
                    input.enterprise_id, input.product_id
                ),
            },
        )
    } else {
        err.into()
    }
}

fn rejected(entity: &'static str, err: AppError) -> AppError {
    let reason = match err {
        AppError::Validation { .. } => "validation",
        AppError::ReferentialIntegrity { .. } => "referential_integrity",
        _ => "other",
    };
    metrics::record_rejected(entity, reason);
    warn!(entity, error = %err, "Write rejected");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::schema::create_schema;
    use sea_orm::{ModelTrait, PaginatorTrait};

    async fn test_repo() -> Repository {
        let pool = DbPool::new(&DatabaseConfig::in_memory_sqlite()).await.unwrap();
        create_schema(pool.conn()).await.unwrap();
        Repository::new(pool)
    }

    fn acme() -> NewEnterprise {
        NewEnterprise::new("Acme", Some("Manufacturing".into()), Some(50))
    }

    fn widget() -> NewProduct {
        NewProduct::new("Widget", Some(Decimal::new(999, 2)))
    }

    fn jan_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    async fn supply_count(repo: &Repository) -> u64 {
        SupplyEntity::find().count(repo.conn()).await.unwrap()
    }

    #[tokio::test]
    async fn test_acme_widget_supply_scenario() {
        let repo = test_repo().await;

        let enterprise = repo.create_enterprise(acme()).await.unwrap();
        assert_eq!(enterprise.id, 1);
        assert_eq!(enterprise.name, "Acme");
        assert_eq!(enterprise.activity_type.as_deref(), Some("Manufacturing"));
        assert_eq!(enterprise.employees_count, Some(50));

        let product = repo.create_product(widget()).await.unwrap();
        assert_eq!(product.id, 1);
        assert_eq!(product.price, Some(Decimal::new(999, 2)));

        let supply = repo
            .create_supply(NewSupply {
                enterprise_id: 1,
                product_id: 1,
                quantity: Some(100),
                supply_date: Some(jan_15()),
            })
            .await
            .unwrap();
        assert_eq!(supply.id, 1);
        assert_eq!(supply.quantity, Some(100));
        assert_eq!(supply.supply_date, Some(jan_15()));
    }

    #[tokio::test]
    async fn test_enterprise_ids_are_fresh_and_positive() {
        let repo = test_repo().await;

        let mut ids = Vec::new();
        for name in ["Acme", "Globex", "Initech"] {
            let enterprise = repo
                .create_enterprise(NewEnterprise::new(name, None, None))
                .await
                .unwrap();
            assert!(enterprise.id > 0);
            assert!(!ids.contains(&enterprise.id));
            ids.push(enterprise.id);
        }

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_optional_fields_may_be_absent() {
        let repo = test_repo().await;

        let enterprise = repo
            .create_enterprise(NewEnterprise::new("Solo", None, None))
            .await
            .unwrap();
        assert_eq!(enterprise.activity_type, None);
        assert_eq!(enterprise.employees_count, None);

        let product = repo.create_product(NewProduct::new("Gift", None)).await.unwrap();
        assert_eq!(product.price, None);
    }

    #[tokio::test]
    async fn test_round_trip_by_id() {
        let repo = test_repo().await;

        let enterprise = repo.create_enterprise(acme()).await.unwrap();
        let product = repo.create_product(widget()).await.unwrap();
        let supply = repo
            .create_supply(NewSupply {
                enterprise_id: enterprise.id,
                product_id: product.id,
                quantity: Some(7),
                supply_date: Some(jan_15()),
            })
            .await
            .unwrap();

        assert_eq!(repo.find_enterprise_by_id(enterprise.id).await.unwrap(), Some(enterprise));
        assert_eq!(repo.find_product_by_id(product.id).await.unwrap(), Some(product));
        assert_eq!(repo.find_supply_by_id(supply.id).await.unwrap(), Some(supply));
    }

    #[tokio::test]
    async fn test_missing_records_read_as_none() {
        let repo = test_repo().await;
        assert_eq!(repo.find_enterprise_by_id(42).await.unwrap(), None);
        assert_eq!(repo.find_product_by_id(42).await.unwrap(), None);
        assert_eq!(repo.find_supply_by_id(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_supply_with_unknown_enterprise_is_rejected() {
        let repo = test_repo().await;
        repo.create_product(widget()).await.unwrap();

        let err = repo
            .create_supply(NewSupply {
                enterprise_id: 999,
                product_id: 1,
                quantity: Some(100),
                supply_date: Some(jan_15()),
            })
            .await
            .unwrap_err();

        match err {
            AppError::ReferentialIntegrity { reference, id } => {
                assert_eq!(reference, "enterprise");
                assert_eq!(id, "999");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(supply_count(&repo).await, 0);
    }

    #[tokio::test]
    async fn test_supply_with_unknown_product_is_rejected() {
        let repo = test_repo().await;
        repo.create_enterprise(acme()).await.unwrap();

        let err = repo
            .create_supply(NewSupply {
                enterprise_id: 1,
                product_id: 999,
                quantity: None,
                supply_date: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ReferentialIntegrity { ref reference, .. } if reference == "product"));
        assert!(err.is_client_error());
        assert_eq!(supply_count(&repo).await, 0);
    }

    #[tokio::test]
    async fn test_rejected_supply_does_not_block_later_writes() {
        let repo = test_repo().await;
        repo.create_enterprise(acme()).await.unwrap();
        repo.create_product(widget()).await.unwrap();

        let bad = NewSupply {
            enterprise_id: 999,
            product_id: 1,
            quantity: None,
            supply_date: None,
        };
        assert!(repo.create_supply(bad).await.is_err());

        let good = NewSupply {
            enterprise_id: 1,
            product_id: 1,
            quantity: Some(1),
            supply_date: None,
        };
        repo.create_supply(good).await.unwrap();
        assert_eq!(supply_count(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_enterprise_validation() {
        let repo = test_repo().await;

        let empty = repo
            .create_enterprise(NewEnterprise::new("", None, None))
            .await
            .unwrap_err();
        assert!(matches!(empty, AppError::Validation { ref field, .. } if field.as_deref() == Some("name")));

        let blank = repo
            .create_enterprise(NewEnterprise::new("   ", None, None))
            .await
            .unwrap_err();
        assert!(matches!(blank, AppError::Validation { .. }));

        let negative = repo
            .create_enterprise(NewEnterprise::new("Acme", None, Some(-1)))
            .await
            .unwrap_err();
        assert!(matches!(negative, AppError::Validation { ref field, .. } if field.as_deref() == Some("employees_count")));

        let too_long = repo
            .create_enterprise(NewEnterprise::new("x".repeat(101), None, None))
            .await
            .unwrap_err();
        assert!(matches!(too_long, AppError::Validation { .. }));

        assert!(repo.list_enterprises().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_product_price_validation() {
        let repo = test_repo().await;

        for price in [Decimal::new(-1, 2), Decimal::new(1234, 3), Decimal::new(100_000_000, 0)] {
            let err = repo
                .create_product(NewProduct::new("Widget", Some(price)))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { ref field, .. } if field.as_deref() == Some("price")));
        }

        // Trailing zeros beyond two digits still fit the column
        repo.create_product(NewProduct::new("Bolt", Some(Decimal::new(12500, 4))))
            .await
            .unwrap();
        repo.create_product(NewProduct::new("Free sample", Some(Decimal::ZERO)))
            .await
            .unwrap();

        assert_eq!(repo.list_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_supplies_by_enterprise_and_product() {
        let repo = test_repo().await;
        let acme = repo.create_enterprise(acme()).await.unwrap();
        let globex = repo
            .create_enterprise(NewEnterprise::new("Globex", None, Some(10)))
            .await
            .unwrap();
        let widget = repo.create_product(widget()).await.unwrap();
        let gadget = repo.create_product(NewProduct::new("Gadget", None)).await.unwrap();

        for (enterprise_id, product_id) in [
            (acme.id, widget.id),
            (acme.id, gadget.id),
            (globex.id, widget.id),
        ] {
            repo.create_supply(NewSupply {
                enterprise_id,
                product_id,
                quantity: Some(1),
                supply_date: None,
            })
            .await
            .unwrap();
        }

        let acme_supplies = repo.find_supplies_by_enterprise(acme.id).await.unwrap();
        assert_eq!(acme_supplies.len(), 2);
        assert!(acme_supplies.iter().all(|s| s.enterprise_id == acme.id));

        let widget_supplies = repo.find_supplies_by_product(widget.id).await.unwrap();
        let widget_enterprises: Vec<i32> = widget_supplies.iter().map(|s| s.enterprise_id).collect();
        assert_eq!(widget_enterprises, vec![acme.id, globex.id]);

        assert!(repo.find_supplies_by_product(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_referenced_enterprise_cannot_be_deleted() {
        let repo = test_repo().await;
        let enterprise = repo.create_enterprise(acme()).await.unwrap();
        let product = repo.create_product(widget()).await.unwrap();
        repo.create_supply(NewSupply {
            enterprise_id: enterprise.id,
            product_id: product.id,
            quantity: Some(5),
            supply_date: None,
        })
        .await
        .unwrap();

        let err = enterprise.clone().delete(repo.conn()).await.unwrap_err();
        assert!(is_foreign_key_violation(&err));
        assert_eq!(repo.find_enterprise_by_id(enterprise.id).await.unwrap(), Some(enterprise));
    }

    #[tokio::test]
    async fn test_database_fk_rejection_maps_to_referential_integrity() {
        let repo = test_repo().await;
        let input = NewSupply {
            enterprise_id: 999,
            product_id: 999,
            quantity: Some(1),
            supply_date: None,
        };

        // Bypass the existence check so the database itself rejects the row
        let err = SupplyActiveModel {
            enterprise_id: Set(input.enterprise_id),
            product_id: Set(input.product_id),
            quantity: Set(input.quantity),
            ..Default::default()
        }
        .insert(repo.conn())
        .await
        .unwrap_err();
        assert!(is_foreign_key_violation(&err));

        match map_supply_insert_error(err, &input) {
            AppError::ReferentialIntegrity { reference, id } => {
                assert_eq!(reference, "enterprise or product");
                assert_eq!(id, "enterprise_id=999, product_id=999");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(supply_count(&repo).await, 0);
    }

    #[test]
    fn test_unrelated_database_error_is_not_remapped() {
        let input = NewSupply {
            enterprise_id: 1,
            product_id: 1,
            quantity: None,
            supply_date: None,
        };
        let err = map_supply_insert_error(DbErr::Custom("disk full".into()), &input);
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_ping() {
        let repo = test_repo().await;
        repo.ping().await.unwrap();
    }
}
