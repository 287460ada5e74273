use std::collections::HashMap;

use cucumber::World;
use medshop_engine::{order_objects::PaymentReservation, SettlementError};

use crate::support::Shop;

#[derive(Default, Debug, World)]
pub struct ShopWorld {
    pub shop: Option<Shop>,
    /// Medicine ids, by name
    pub medicines: HashMap<String, i64>,
    pub reservation: Option<PaymentReservation>,
    pub last_error: Option<SettlementError>,
}

impl ShopWorld {
    pub fn shop(&self) -> &Shop {
        self.shop.as_ref().expect("Shop not initialised")
    }

    pub fn medicine_id(&self, name: &str) -> i64 {
        *self.medicines.get(name).unwrap_or_else(|| panic!("Unknown medicine {name}"))
    }

    pub fn session_id(&self) -> String {
        self.reservation.as_ref().expect("No payment session was reserved").session_id.clone()
    }
}
