pub mod cart;
pub mod customer;
pub mod discount;
pub mod gift_card;
pub mod shipping;
