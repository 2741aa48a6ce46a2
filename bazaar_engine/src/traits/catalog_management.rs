use crate::{
    db_types::{Channel, NewProduct, NewShop, Product, ProductUpdate, Shop, ShopUpdate},
    traits::CatalogError,
};

/// Shops and products. A seller owns at most one shop, and every product belongs to its seller's shop and channel.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn create_shop(&self, seller_id: i64, shop: NewShop) -> Result<Shop, CatalogError>;

    async fn update_shop(&self, seller_id: i64, update: ShopUpdate) -> Result<Shop, CatalogError>;

    async fn set_shop_open(&self, seller_id: i64, is_open: bool) -> Result<Shop, CatalogError>;

    async fn fetch_shop(&self, shop_id: i64) -> Result<Option<Shop>, CatalogError>;

    async fn fetch_shop_for_seller(&self, seller_id: i64) -> Result<Option<Shop>, CatalogError>;

    async fn list_shops(&self, channel: Option<Channel>) -> Result<Vec<Shop>, CatalogError>;

    /// Adds a product to the seller's shop. The product inherits the shop's channel.
    async fn create_product(&self, seller_id: i64, product: NewProduct) -> Result<Product, CatalogError>;

    async fn update_product(
        &self,
        seller_id: i64,
        product_id: i64,
        update: ProductUpdate,
    ) -> Result<Product, CatalogError>;

    /// Removes the product from the catalog and from every cart. Past orders keep their snapshot.
    async fn delete_product(&self, seller_id: i64, product_id: i64) -> Result<(), CatalogError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError>;

    async fn list_products_for_shop(&self, shop_id: i64, available_only: bool) -> Result<Vec<Product>, CatalogError>;

    /// Case-insensitive substring search over the names and descriptions of available products in open shops.
    async fn search_products(&self, query: &str, channel: Option<Channel>) -> Result<Vec<Product>, CatalogError>;
}
