use crate::{EngineError, ProductStockLevel, ResultEngine};

use super::Engine;

impl Engine {
    /// Units on hand for `product`, as reported by the stock adjuster.
    pub async fn product_stock(&self, product: &str) -> ResultEngine<ProductStockLevel> {
        let product = product.to_string();
        self.with_tx(move |engine, db_tx| {
            let product = product.clone();
            Box::pin(async move {
                engine
                    .stock
                    .stock_level(db_tx, &product)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("product {product}")))
            })
        })
        .await
    }
}
