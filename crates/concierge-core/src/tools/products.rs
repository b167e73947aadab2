//! Read-only product catalogue.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::ToolOutcome;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub in_stock: bool,
    pub stock_quantity: u32,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, String>,
}

impl Product {
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.category.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

pub struct ProductTools {
    products: HashMap<String, Product>,
}

impl ProductTools {
    /// Catalogue seeded with the demo products.
    pub fn new() -> Self {
        Self::with_products(seed_products())
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|p| (p.id.to_uppercase(), p))
                .collect(),
        }
    }

    fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.get(&product_id.trim().to_uppercase())
    }

    /// Case-insensitive substring search over name, category and description.
    /// Results are ordered by product id.
    pub async fn search_products(&self, query: &str) -> ToolOutcome {
        let needle = query.trim().to_lowercase();
        let mut results: Vec<&Product> = self
            .products
            .values()
            .filter(|p| p.matches(&needle))
            .collect();
        results.sort_by(|a, b| a.id.cmp(&b.id));

        ToolOutcome::success(serde_json::json!({
            "count": results.len(),
            "products": results,
        }))
    }

    pub async fn get_product_details(&self, product_id: &str) -> ToolOutcome {
        match self.get(product_id) {
            Some(product) => ToolOutcome::success(serde_json::json!({ "product": product })),
            None => not_found(product_id),
        }
    }

    pub async fn check_availability(&self, product_id: &str) -> ToolOutcome {
        match self.get(product_id) {
            Some(product) => ToolOutcome::success(serde_json::json!({
                "available": product.in_stock,
                "quantity": product.stock_quantity,
            })),
            None => not_found(product_id),
        }
    }
}

impl Default for ProductTools {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(product_id: &str) -> ToolOutcome {
    ToolOutcome::failure(format!("Product {} not found", product_id))
}

fn seed_products() -> Vec<Product> {
    let specifications = [
        ("RAM", "16GB"),
        ("Storage", "1TB SSD"),
        ("Processor", "Intel i7"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    vec![
        Product {
            id: "PROD001".to_string(),
            name: "Gaming Laptop".to_string(),
            category: "Electronics".to_string(),
            price: 1299.99,
            in_stock: true,
            stock_quantity: 15,
            description: "High-performance gaming laptop with RTX 4060".to_string(),
            specifications,
        },
        Product {
            id: "PROD002".to_string(),
            name: "Wireless Headphones".to_string(),
            category: "Electronics".to_string(),
            price: 199.99,
            in_stock: true,
            stock_quantity: 50,
            description: "Premium wireless headphones with noise cancellation".to_string(),
            specifications: BTreeMap::new(),
        },
        Product {
            id: "PROD003".to_string(),
            name: "Smartphone".to_string(),
            category: "Electronics".to_string(),
            price: 699.99,
            in_stock: false,
            stock_quantity: 0,
            description: "Latest flagship smartphone".to_string(),
            specifications: BTreeMap::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_out_of_stock_availability() {
        let tools = ProductTools::new();
        let outcome = tools.check_availability("PROD003").await;
        let data = outcome.data().unwrap();
        assert_eq!(data["available"], false);
        assert_eq!(data["quantity"], 0);
    }

    #[tokio::test]
    async fn test_search_gaming_matches_one_product() {
        let tools = ProductTools::new();
        let outcome = tools.search_products("gaming").await;
        let data = outcome.data().unwrap();
        assert_eq!(data["count"], 1);
        assert_eq!(data["products"][0]["id"], "PROD001");
    }

    #[tokio::test]
    async fn test_search_by_category_is_ordered() {
        let tools = ProductTools::new();
        let outcome = tools.search_products("ELECTRONICS").await;
        let data = outcome.data().unwrap();
        assert_eq!(data["count"], 3);
        assert_eq!(data["products"][2]["id"], "PROD003");
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let tools = ProductTools::new();
        let outcome = tools.get_product_details("PROD404").await;
        assert_eq!(outcome.message(), Some("Product PROD404 not found"));
        assert!(outcome.data().is_none());
    }
}
