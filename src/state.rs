use std::sync::Arc;

use mongodb::{Collection, Database};

use crate::config::Config;
use crate::model::{booking::Booking, service::Service, user::User};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn services(&self) -> Collection<Service> {
        self.db.collection("services")
    }

    pub fn bookings(&self) -> Collection<Booking> {
        self.db.collection("bookings")
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }
}
