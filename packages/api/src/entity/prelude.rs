pub use super::category::Entity as Category;
pub use super::contact::Entity as Contact;
pub use super::order::Entity as Order;
pub use super::order_item::Entity as OrderItem;
pub use super::parameter::Entity as Parameter;
pub use super::product::Entity as Product;
pub use super::product_info::Entity as ProductInfo;
pub use super::product_parameter::Entity as ProductParameter;
pub use super::shop::Entity as Shop;
pub use super::shop_category::Entity as ShopCategory;
pub use super::user::Entity as User;
