//! Customer delivery addresses.

use gobble_core::api::AddressView;
use gobble_core::checkout::CheckoutAddress;
use gobble_core::{AddressId, CustomerId, GeoPoint};

#[derive(Debug, Clone)]
pub struct Address {
    pub id: AddressId,
    pub customer_id: CustomerId,
    pub label: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub location: GeoPoint,
    pub is_default: bool,
}

impl Address {
    /// Single-line form stored on orders.
    #[must_use]
    pub fn one_line(&self) -> String {
        if self.postal_code.is_empty() {
            format!("{}, {}", self.street, self.city)
        } else {
            format!("{}, {} {}", self.street, self.postal_code, self.city)
        }
    }

    #[must_use]
    pub const fn checkout_address(&self) -> CheckoutAddress {
        CheckoutAddress {
            id: self.id,
            location: self.location,
        }
    }
}

impl From<&Address> for AddressView {
    fn from(a: &Address) -> Self {
        Self {
            id: a.id,
            label: a.label.clone(),
            street: a.street.clone(),
            city: a.city.clone(),
            postal_code: a.postal_code.clone(),
            location: a.location,
            is_default: a.is_default,
        }
    }
}
