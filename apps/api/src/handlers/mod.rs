//! HTTP handlers, one module per resource.
//!
//! Handlers stay thin: extract, call one repository method, wrap the
//! result in `Json`. Business rules live in shelfwise-core and
//! transactions in shelfwise-db.

pub mod coupons;
pub mod grns;
pub mod health;
pub mod inventory;
pub mod locations;
pub mod orders;
pub mod petty_cash;
pub mod products;
pub mod purchase_orders;
pub mod reports;
pub mod suppliers;

/// Builders shared by handler tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::AppState;
    use shelfwise_core::{NewLocation, NewProduct, NewSupplier, Product};

    pub async fn location(state: &AppState, name: &str) -> String {
        state
            .db
            .locations()
            .create(&NewLocation {
                name: name.to_string(),
                address: None,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn product(state: &AppState, sku: &str, selling_price_cents: i64, cost_price_cents: i64) -> Product {
        state
            .db
            .products()
            .create(&NewProduct {
                sku: sku.to_string(),
                name: format!("Product {sku}"),
                description: None,
                category: None,
                brand: None,
                selling_price_cents,
                cost_price_cents,
            })
            .await
            .unwrap()
    }

    pub async fn supplier(state: &AppState, name: &str) -> String {
        state
            .db
            .suppliers()
            .create(&NewSupplier {
                name: name.to_string(),
                contact_person: None,
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap()
            .id
    }
}
