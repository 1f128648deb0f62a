//! Shipping/billing address value object.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub pincode: String,
    #[validate(length(min = 2))]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Address {
    /// The fields shipping-rule matching cares about.
    pub fn destination(&self) -> super::shipping::Destination {
        super::shipping::Destination {
            country: self.country.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
        }
    }
}
