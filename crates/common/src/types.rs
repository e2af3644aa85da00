use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database row id.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row id.
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Identifier of a catalog product row.
    ProductId
);

row_id!(
    /// Identifier of a product category row.
    CategoryId
);

row_id!(
    /// Identifier of a discount coupon row.
    CouponId
);

row_id!(
    /// Identifier of a placed order row.
    ///
    /// Customers never see this; they track orders by order number.
    OrderId
);
