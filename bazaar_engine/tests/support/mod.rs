#![allow(dead_code)]

use bazaar_engine::{
    db_types::*,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountApi,
    AdminApi,
    CartApi,
    CatalogApi,
    OrderFlowApi,
    SqliteDatabase,
};

/// A small marketplace: two food sellers with one shop each, a grocery seller, a customer with a saved address and
/// a delivery agent.
pub struct Marketplace {
    pub db: SqliteDatabase,
    pub customer: UserAccount,
    pub address: Address,
    pub seller_a: UserAccount,
    pub seller_b: UserAccount,
    pub grocer: UserAccount,
    pub agent: UserAccount,
    pub shop_a: Shop,
    pub shop_b: Shop,
    /// ₹120.00, shop A
    pub dosa: Product,
    /// ₹20.00, shop A
    pub chai: Product,
    /// ₹250.00, shop B
    pub biryani: Product,
    /// ₹60.00, grocery shop
    pub rice: Product,
}

impl Marketplace {
    pub fn orders(&self) -> OrderFlowApi<SqliteDatabase> {
        OrderFlowApi::new(self.db.clone(), EventProducers::default())
    }

    pub fn carts(&self) -> CartApi<SqliteDatabase> {
        CartApi::new(self.db.clone())
    }

    pub fn catalog(&self) -> CatalogApi<SqliteDatabase> {
        CatalogApi::new(self.db.clone())
    }

    pub fn accounts(&self) -> AccountApi<SqliteDatabase> {
        AccountApi::new(self.db.clone())
    }

    pub fn admin(&self) -> AdminApi<SqliteDatabase> {
        AdminApi::new(self.db.clone())
    }

    /// Fills the customer's food cart and places an order for it.
    pub async fn place_food_order(&self, lines: &[(&Product, i64)], method: PaymentMethod) -> Order {
        let carts = self.carts();
        for (product, quantity) in lines {
            carts.add_item(self.customer.id, Channel::Food, product.id, *quantity).await.expect("Error filling cart");
        }
        self.orders().checkout(self.customer.id, Channel::Food, self.address.id, method).await.expect("Checkout failed")
    }

    pub fn item_for(&self, order: &Order, product: &Product) -> OrderItem {
        order.items.iter().find(|i| i.product_id == product.id).cloned().expect("Product is not in the order")
    }
}

pub fn new_address(label: &str) -> NewAddress {
    NewAddress {
        label: label.to_string(),
        line1: "12 MG Road".to_string(),
        line2: None,
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pincode: "560001".to_string(),
        phone: "9000000001".to_string(),
        is_default: false,
    }
}

fn new_product(name: &str, rupees: i64) -> NewProduct {
    NewProduct { name: name.to_string(), description: None, price: Money::from_rupees(rupees), image_url: None }
}

fn new_shop(name: &str, channel: Channel) -> NewShop {
    NewShop { name: name.to_string(), description: None, channel, address: "Indiranagar, Bengaluru".to_string() }
}

pub async fn marketplace() -> Marketplace {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let admin = AdminApi::new(db.clone());
    let accounts = AccountApi::new(db.clone());
    let catalog = CatalogApi::new(db.clone());

    let customer = db_create_customer(&db, "Asha", "9000000001").await;
    let address = accounts.add_address(customer.id, new_address("Home")).await.expect("Error adding address");

    let register = |name: &str, phone: &str, role: Role| NewUserAccount::customer(name, phone).with_role(role);
    let seller_a = admin.register_user(register("Ravi", "9000000002", Role::Seller)).await.expect("seller a");
    let seller_b = admin.register_user(register("Meena", "9000000003", Role::Seller)).await.expect("seller b");
    let grocer = admin.register_user(register("Kiran", "9000000004", Role::Seller)).await.expect("grocer");
    let agent = admin.register_user(register("Suresh", "9000000005", Role::DeliveryBoy)).await.expect("agent");

    let shop_a = catalog.open_shop(seller_a.id, new_shop("Dosa Corner", Channel::Food)).await.expect("shop a");
    let shop_b = catalog.open_shop(seller_b.id, new_shop("Biryani House", Channel::Food)).await.expect("shop b");
    catalog.open_shop(grocer.id, new_shop("Fresh Mart", Channel::Grocery)).await.expect("grocery shop");

    let dosa = catalog.add_product(seller_a.id, new_product("Masala Dosa", 120)).await.expect("dosa");
    let chai = catalog.add_product(seller_a.id, new_product("Chai", 20)).await.expect("chai");
    let biryani = catalog.add_product(seller_b.id, new_product("Chicken Biryani", 250)).await.expect("biryani");
    let rice = catalog.add_product(grocer.id, new_product("Sona Masoori 1kg", 60)).await.expect("rice");

    Marketplace {
        db,
        customer,
        address,
        seller_a,
        seller_b,
        grocer,
        agent,
        shop_a,
        shop_b,
        dosa,
        chai,
        biryani,
        rice,
    }
}

/// Customers normally sign up through OTP verification. Tests that are not about auth create them directly.
pub async fn db_create_customer(db: &SqliteDatabase, name: &str, phone: &str) -> UserAccount {
    use bazaar_engine::traits::AccountManagement;
    db.create_user(NewUserAccount::customer(name, phone)).await.expect("Error creating customer")
}
