use cucumber::given;

use crate::{
    cucumber::ShopWorld,
    support::Shop,
};

#[given("a fresh install")]
async fn fresh_database(world: &mut ShopWorld) {
    world.shop = Some(Shop::new().await);
}

#[given("a fresh install without a payment gateway")]
async fn fresh_database_without_gateway(world: &mut ShopWorld) {
    world.shop = Some(Shop::without_gateway().await);
}

#[given(expr = "the medicine '{word}' priced at {int} paise with {int} in stock")]
async fn add_medicine(world: &mut ShopWorld, name: String, price: i64, stock: i64) {
    let medicine = world.shop().add_medicine(&name, price, stock).await;
    world.medicines.insert(name, medicine.id);
}
