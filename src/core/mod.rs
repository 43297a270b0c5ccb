//! Core module containing the domain types, services and store traits

pub mod auth;
pub mod error;
pub mod model;
pub mod orders;
pub mod store;

pub use auth::{AccountService, LoginOutcome, Signup, TokenClaims, TokenSigner};
pub use error::{AccountError, AppError, AppResult, OrderError, StoreError, ValidationError};
pub use model::{
    BuyerId, CartItem, NewOrderItem, NewProduct, Order, OrderId, OrderItem, OrderReceipt,
    OrderStatus, Product, ProductId, User, UserId,
};
pub use orders::{EmptyCartPolicy, OrderDetails, OrderIntake, OrderPolicy, PlaceOrder, TotalCheck};
pub use store::{OrderStore, OrderWriter, ProductStore, StoreResult, UserStore};
