//! Shops and products.
//!
//! Sellers own exactly one shop, and every product they list belongs to it. Product listings and search are public.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{is_valid_price, Channel, NewProduct, NewShop, Product, ProductUpdate, Shop, ShopUpdate},
    traits::{CatalogError, CatalogManagement},
};

pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::ValidationError(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn open_shop(&self, seller_id: i64, shop: NewShop) -> Result<Shop, CatalogError> {
        require_text("Shop name", &shop.name)?;
        require_text("Shop address", &shop.address)?;
        let shop = self.db.create_shop(seller_id, shop).await?;
        info!("🏪️ Seller #{seller_id} opened {} shop '{}'", shop.channel, shop.name);
        Ok(shop)
    }

    pub async fn update_shop(&self, seller_id: i64, update: ShopUpdate) -> Result<Shop, CatalogError> {
        if let Some(name) = &update.name {
            require_text("Shop name", name)?;
        }
        if update.is_empty() {
            return self.my_shop(seller_id).await;
        }
        self.db.update_shop(seller_id, update).await
    }

    /// Opening and closing the shop. Closed shops keep their products, but nothing from them can be checked out.
    pub async fn set_shop_open(&self, seller_id: i64, is_open: bool) -> Result<Shop, CatalogError> {
        let shop = self.db.set_shop_open(seller_id, is_open).await?;
        debug!("🏪️ Shop '{}' is now {}", shop.name, if is_open { "open" } else { "closed" });
        Ok(shop)
    }

    pub async fn my_shop(&self, seller_id: i64) -> Result<Shop, CatalogError> {
        self.db.fetch_shop_for_seller(seller_id).await?.ok_or(CatalogError::ShopNotFound)
    }

    pub async fn shop(&self, shop_id: i64) -> Result<Shop, CatalogError> {
        self.db.fetch_shop(shop_id).await?.ok_or(CatalogError::ShopNotFound)
    }

    pub async fn shops(&self, channel: Option<Channel>) -> Result<Vec<Shop>, CatalogError> {
        self.db.list_shops(channel).await
    }

    pub async fn add_product(&self, seller_id: i64, product: NewProduct) -> Result<Product, CatalogError> {
        require_text("Product name", &product.name)?;
        if !is_valid_price(product.price) {
            return Err(CatalogError::InvalidPrice);
        }
        let product = self.db.create_product(seller_id, product).await?;
        debug!("🏪️ Seller #{seller_id} listed '{}' at {}", product.name, product.price);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        seller_id: i64,
        product_id: i64,
        update: ProductUpdate,
    ) -> Result<Product, CatalogError> {
        if let Some(name) = &update.name {
            require_text("Product name", name)?;
        }
        if update.price.is_some_and(|p| !is_valid_price(p)) {
            return Err(CatalogError::InvalidPrice);
        }
        if update.is_empty() {
            return match self.db.fetch_product(product_id).await? {
                Some(p) if p.seller_id == seller_id => Ok(p),
                Some(_) => Err(CatalogError::NotOwner(format!("product {product_id}"))),
                None => Err(CatalogError::ProductNotFound(product_id)),
            };
        }
        self.db.update_product(seller_id, product_id, update).await
    }

    pub async fn remove_product(&self, seller_id: i64, product_id: i64) -> Result<(), CatalogError> {
        self.db.delete_product(seller_id, product_id).await
    }

    pub async fn product(&self, product_id: i64) -> Result<Product, CatalogError> {
        self.db.fetch_product(product_id).await?.ok_or(CatalogError::ProductNotFound(product_id))
    }

    /// The products of a shop. The public storefront only shows available products. Sellers see all of their own.
    pub async fn products_for_shop(&self, shop_id: i64, available_only: bool) -> Result<Vec<Product>, CatalogError> {
        let shop = self.shop(shop_id).await?;
        self.db.list_products_for_shop(shop.id, available_only).await
    }

    /// Case-insensitive substring search over available products in open shops.
    pub async fn search(&self, query: &str, channel: Option<Channel>) -> Result<Vec<Product>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.db.search_products(query, channel).await
    }
}
